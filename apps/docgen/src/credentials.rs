//! Credential providers for the document service.
//!
//! Tokens live in memory only. The OAuth provider exchanges a long-lived
//! refresh token for access tokens and refreshes shortly before expiry.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::CredentialSource;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Tokens within this margin of expiry are refreshed before use.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint rejected refresh (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a bearer token that is valid right now, refreshing as needed.
    async fn get_valid_credential(&self) -> Result<String, CredentialError>;
}

/// A pre-issued access token, used as-is.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn get_valid_credential(&self) -> Result<String, CredentialError> {
        Ok(self.0.clone())
    }
}

/// Google "authorized_user" credentials.
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN_SECS
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

/// Refresh-token grant against the configured token endpoint.
pub struct RefreshingProvider {
    client: Client,
    user: AuthorizedUser,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshingProvider {
    pub fn new(user: AuthorizedUser) -> Result<Self, CredentialError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            user,
            cached: Mutex::new(None),
        })
    }

    async fn refresh(&self) -> Result<CachedToken, CredentialError> {
        let response = self
            .client
            .post(&self.user.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.user.client_id.as_str()),
                ("client_secret", self.user.client_secret.as_str()),
                ("refresh_token", self.user.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {description}", e.error),
                    None => e.error,
                })
                .unwrap_or(body);
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response.json().await?;
        info!("Access token refreshed (expires in {}s)", token.expires_in);
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[async_trait]
impl CredentialProvider for RefreshingProvider {
    async fn get_valid_credential(&self) -> Result<String, CredentialError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            debug!("Using cached access token");
            return Ok(token.access_token.clone());
        }

        let token = self.refresh().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}

/// Builds the provider selected by configuration.
pub fn provider_from_source(
    source: &CredentialSource,
) -> Result<Arc<dyn CredentialProvider>, CredentialError> {
    Ok(match source {
        CredentialSource::AccessToken(token) => Arc::new(StaticToken::new(token.clone())),
        CredentialSource::AuthorizedUser(user) => Arc::new(RefreshingProvider::new(user.clone())?),
    })
}
