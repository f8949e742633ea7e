// Template copy lifecycle, placeholder substitution and PDF export.
// All remote calls go through docs_client::DocumentService.

pub mod copy_manager;
pub mod exporter;
pub mod substitution;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::docs_client::{DocumentHandle, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Cv,
    CoverLetter,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Cv => f.write_str("CV"),
            DocumentKind::CoverLetter => f.write_str("cover letter"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Template {template} is unreachable: {source}")]
    TemplateUnreachable {
        template: DocumentHandle,
        source: ServiceError,
    },

    #[error("Could not copy template {template}: {source}")]
    CopyCreationFailed {
        template: DocumentHandle,
        source: ServiceError,
    },

    #[error("Copying template {template} returned the template itself")]
    CopyIdentityViolation { template: DocumentHandle },

    #[error("Working copy {expected} resolved to document {actual}")]
    DocumentIdentityMismatch {
        expected: DocumentHandle,
        actual: DocumentHandle,
    },

    #[error("Refusing to substitute into template {template}")]
    TemplateMutationRejected { template: DocumentHandle },

    #[error("Placeholder substitution in {handle} failed: {source}")]
    SubstitutionFailed {
        handle: DocumentHandle,
        source: ServiceError,
    },

    #[error("PDF export of {handle} failed: {source}")]
    ExportFailed {
        handle: DocumentHandle,
        source: ServiceError,
    },

    #[error("Could not write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not delete working copy {handle}: {source}")]
    CleanupFailed {
        handle: DocumentHandle,
        source: ServiceError,
    },
}

impl DocumentError {
    /// Errors meaning the template itself was at risk. Never recovered from.
    pub fn is_hard_stop(&self) -> bool {
        matches!(
            self,
            DocumentError::CopyIdentityViolation { .. }
                | DocumentError::DocumentIdentityMismatch { .. }
                | DocumentError::TemplateMutationRejected { .. }
        )
    }

    /// The service resolved a working copy to `template`. Deleting that copy
    /// would delete the template.
    pub fn resolves_to_template(&self, template: &DocumentHandle) -> bool {
        match self {
            DocumentError::TemplateMutationRejected { .. } => true,
            DocumentError::DocumentIdentityMismatch { actual, .. } => actual == template,
            _ => false,
        }
    }
}
