//! Docs client: the single point of entry for the remote document service.
//!
//! The workflow only ever talks to the `DocumentService` trait; `GoogleDocsClient`
//! is the production backend (Docs API for identity and text replacement,
//! Drive API for copy, export and delete).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::credentials::{CredentialError, CredentialProvider};

mod requests;

#[cfg(test)]
pub mod fake;

use requests::{
    api_error_message, batch_update_body, occurrences_changed, BatchUpdateResponse,
    DocumentMeta, DriveFile,
};

pub const DEFAULT_DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Opaque identifier of a remote document (template or working copy).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only rendering the service is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

/// One literal, case-sensitive replace-all instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReplacement {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Document not found: {0}")]
    NotFound(DocumentHandle),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// The five capabilities the workflow needs from a document service.
///
/// Carried in `AppState` as `Arc<dyn DocumentService>`.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Resolves the identity the service reports for `handle`.
    async fn get(&self, handle: &DocumentHandle) -> Result<DocumentHandle, ServiceError>;

    async fn copy(&self, handle: &DocumentHandle) -> Result<DocumentHandle, ServiceError>;

    /// Applies all replacements as one batch. Returns the occurrence count per replacement.
    async fn batch_replace_text(
        &self,
        handle: &DocumentHandle,
        replacements: &[TextReplacement],
    ) -> Result<Vec<u32>, ServiceError>;

    async fn export_as(
        &self,
        handle: &DocumentHandle,
        format: ExportFormat,
    ) -> Result<Bytes, ServiceError>;

    async fn delete(&self, handle: &DocumentHandle) -> Result<(), ServiceError>;
}

/// Google Docs + Drive REST backend.
#[derive(Clone)]
pub struct GoogleDocsClient {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    docs_base: String,
    drive_base: String,
}

impl GoogleDocsClient {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        docs_base: &str,
        drive_base: &str,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            credentials,
            docs_base: docs_base.trim_end_matches('/').to_string(),
            drive_base: drive_base.trim_end_matches('/').to_string(),
        })
    }

    /// Attaches a bearer token, sends the request and maps non-2xx statuses.
    async fn send(
        &self,
        request: RequestBuilder,
        handle: &DocumentHandle,
    ) -> Result<Response, ServiceError> {
        let token = self.credentials.get_valid_credential().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(handle.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Document service returned {status} for {handle}");
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl DocumentService for GoogleDocsClient {
    async fn get(&self, handle: &DocumentHandle) -> Result<DocumentHandle, ServiceError> {
        let url = format!("{}/documents/{}", self.docs_base, handle);
        let request = self.client.get(url).query(&[("fields", "documentId")]);
        let meta: DocumentMeta = self.send(request, handle).await?.json().await?;
        Ok(DocumentHandle::new(meta.document_id))
    }

    async fn copy(&self, handle: &DocumentHandle) -> Result<DocumentHandle, ServiceError> {
        let url = format!("{}/files/{}/copy", self.drive_base, handle);
        let request = self.client.post(url).json(&serde_json::json!({}));
        let file: DriveFile = self.send(request, handle).await?.json().await?;
        debug!("Drive copied {handle} to {}", file.id);
        Ok(DocumentHandle::new(file.id))
    }

    async fn batch_replace_text(
        &self,
        handle: &DocumentHandle,
        replacements: &[TextReplacement],
    ) -> Result<Vec<u32>, ServiceError> {
        let url = format!("{}/documents/{}:batchUpdate", self.docs_base, handle);
        let request = self.client.post(url).json(&batch_update_body(replacements));
        let response: BatchUpdateResponse = self.send(request, handle).await?.json().await?;
        Ok(occurrences_changed(&response, replacements.len()))
    }

    async fn export_as(
        &self,
        handle: &DocumentHandle,
        format: ExportFormat,
    ) -> Result<Bytes, ServiceError> {
        let url = format!("{}/files/{}/export", self.drive_base, handle);
        let request = self
            .client
            .get(url)
            .query(&[("mimeType", format.mime_type())]);
        let bytes = self.send(request, handle).await?.bytes().await?;
        debug!("Exported {handle} as {} ({} bytes)", format.mime_type(), bytes.len());
        Ok(bytes)
    }

    async fn delete(&self, handle: &DocumentHandle) -> Result<(), ServiceError> {
        let url = format!("{}/files/{}", self.drive_base, handle);
        self.send(self.client.delete(url), handle).await?;
        Ok(())
    }
}
