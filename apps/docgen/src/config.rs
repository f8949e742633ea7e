use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::credentials::AuthorizedUser;
use crate::docs_client::{DocumentHandle, DEFAULT_DOCS_API_BASE, DEFAULT_DRIVE_API_BASE};
use crate::documents::DocumentKind;

/// Where the document service credentials come from.
#[derive(Clone)]
pub enum CredentialSource {
    AccessToken(String),
    AuthorizedUser(AuthorizedUser),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
            CredentialSource::AuthorizedUser(user) => {
                f.debug_tuple("AuthorizedUser").field(user).finish()
            }
        }
    }
}

/// One template to render per submission, and the file name it is written to.
#[derive(Debug, Clone)]
pub struct DocumentTarget {
    pub kind: DocumentKind,
    pub template: DocumentHandle,
    pub output_filename: String,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or invalid.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// CV first, then the optional cover letter.
    pub documents: Vec<DocumentTarget>,
    pub output_dir: PathBuf,
    pub credentials: CredentialSource,
    pub docs_api_base: String,
    pub drive_api_base: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Only the database URL, for commands that never touch documents.
    pub fn database_url_from_env() -> Result<String> {
        dotenvy::dotenv().ok();

        database_url(|key| std::env::var(key).ok())
    }

    /// Builds and validates a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let mut documents = vec![DocumentTarget {
            kind: DocumentKind::Cv,
            template: DocumentHandle::new(require("CV_TEMPLATE_ID")?),
            output_filename: var("CV_OUTPUT_FILENAME").unwrap_or_else(|| "cv.pdf".to_string()),
        }];
        match (var("COVER_LETTER_TEMPLATE_ID"), var("COVER_LETTER_OUTPUT_FILENAME")) {
            (Some(template), output_filename) => documents.push(DocumentTarget {
                kind: DocumentKind::CoverLetter,
                template: DocumentHandle::new(template),
                output_filename: output_filename
                    .unwrap_or_else(|| "lettre_motivation.pdf".to_string()),
            }),
            (None, Some(_)) => {
                bail!("COVER_LETTER_OUTPUT_FILENAME is set but COVER_LETTER_TEMPLATE_ID is not")
            }
            (None, None) => {}
        }
        validate_documents(&documents)?;

        let credentials = match (var("GOOGLE_ACCESS_TOKEN"), var("GOOGLE_CREDENTIALS_JSON")) {
            (Some(token), None) => CredentialSource::AccessToken(token),
            (None, Some(json)) => CredentialSource::AuthorizedUser(
                serde_json::from_str(&json)
                    .context("GOOGLE_CREDENTIALS_JSON must be an authorized-user JSON document")?,
            ),
            (Some(_), Some(_)) => {
                bail!("Set only one of GOOGLE_ACCESS_TOKEN and GOOGLE_CREDENTIALS_JSON")
            }
            (None, None) => {
                bail!("Either GOOGLE_ACCESS_TOKEN or GOOGLE_CREDENTIALS_JSON must be set")
            }
        };

        Ok(Config {
            database_url: database_url(&lookup)?,
            documents,
            output_dir: PathBuf::from(var("OUTPUT_DIR").unwrap_or_else(|| "output".to_string())),
            credentials,
            docs_api_base: var("DOCS_API_BASE")
                .unwrap_or_else(|| DEFAULT_DOCS_API_BASE.to_string()),
            drive_api_base: var("DRIVE_API_BASE")
                .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string()),
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
        })
    }

    /// Looks up the configured document whose output file is `filename`.
    pub fn document_for_filename(&self, filename: &str) -> Option<&DocumentTarget> {
        self.documents
            .iter()
            .find(|d| d.output_filename == filename)
    }
}

fn database_url<F>(lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup("DATABASE_URL")
        .filter(|v| !v.trim().is_empty())
        .context("Required environment variable 'DATABASE_URL' is not set")
}

fn validate_documents(documents: &[DocumentTarget]) -> Result<()> {
    for doc in documents {
        let name = &doc.output_filename;
        if name.contains(['/', '\\']) || name.starts_with('.') || !name.ends_with(".pdf") {
            bail!("Output filename '{name}' for the {} must be a plain .pdf file name", doc.kind);
        }
    }
    if let [first, second] = documents {
        if first.output_filename == second.output_filename {
            bail!("CV and cover letter must use different output filenames");
        }
        if first.template == second.template {
            bail!("CV and cover letter must use different templates");
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_config(output_dir: &std::path::Path) -> Config {
    let vars = [
        ("DATABASE_URL", "postgres://localhost/docgen_test"),
        ("CV_TEMPLATE_ID", "cv-template"),
        ("COVER_LETTER_TEMPLATE_ID", "letter-template"),
        ("GOOGLE_ACCESS_TOKEN", "test-token"),
    ];
    let mut config = Config::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
    .expect("test config must be valid");
    config.output_dir = output_dir.to_path_buf();
    config
}
