use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::submission::form::FormError;
use crate::submission::workflow::SubmissionFailure;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document generation failed: {0}")]
    Generation(#[from] SubmissionFailure),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<FormError> for AppError {
    fn from(e: FormError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Generation(failure) if failure.error.is_hard_stop() => {
                tracing::error!("Template safety check failed: {failure}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TEMPLATE_SAFETY_ERROR",
                    failure.to_string(),
                )
            }
            AppError::Generation(failure) => (
                StatusCode::BAD_GATEWAY,
                "DOCUMENT_ERROR",
                failure.to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let AppError::Generation(failure) = &self {
            error["submission_id"] = json!(failure.submission_id);
            error["warnings"] = json!(failure.warnings);
        }
        let body = Json(json!({ "error": error }));

        (status, body).into_response()
    }
}
