//! Axum route handlers for the Submission API.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::documents::DocumentKind;
use crate::errors::AppError;
use crate::models::submission::SubmissionRecord;
use crate::skills::{Skill, SKILLS};
use crate::submission::form::SubmissionForm;
use crate::submission::workflow::{submission_file_path, SubmissionWarning, WorkflowState};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FileLink {
    pub document: DocumentKind,
    pub filename: String,
    pub bytes: u64,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub submission_id: Uuid,
    pub state: WorkflowState,
    pub message: String,
    pub files: Vec<FileLink>,
    pub record_id: Option<i32>,
    pub warnings: Vec<SubmissionWarning>,
}

/// GET /api/v1/skills
pub async fn handle_list_skills() -> Json<&'static [Skill]> {
    Json(SKILLS)
}

/// POST /api/v1/submissions
///
/// Generates every configured document from the form. 201 on success, even
/// when the submission could not be recorded (reported under `warnings`).
pub async fn handle_create_submission(
    State(state): State<AppState>,
    Json(form): Json<SubmissionForm>,
) -> Result<(StatusCode, Json<SubmissionResponse>), AppError> {
    let values = form.into_field_values()?;
    info!(
        "Submission received for company: {}, position: {}",
        values.get_or_empty("entreprise"),
        values.get_or_empty("poste")
    );

    let outcome = state.workflow.run(&values).await?;

    let files = outcome
        .files
        .iter()
        .map(|f| FileLink {
            document: f.document,
            filename: f.filename.clone(),
            bytes: f.bytes,
            download_url: format!(
                "/api/v1/submissions/{}/files/{}",
                outcome.submission_id, f.filename
            ),
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            submission_id: outcome.submission_id,
            state: outcome.state,
            message: outcome.message(),
            files,
            record_id: outcome.record_id,
            warnings: outcome.warnings,
        }),
    ))
}

/// GET /api/v1/submissions/:submission_id/files/:filename
///
/// Only configured output names are served, so the path cannot leave the output directory.
pub async fn handle_download(
    State(state): State<AppState>,
    Path((submission_id, filename)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    if state.config.document_for_filename(&filename).is_none() {
        return Err(AppError::NotFound(format!("File {filename} not found")));
    }

    let path = submission_file_path(state.workflow.output_dir(), submission_id, &filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!(
                "File {filename} not found for submission {submission_id}"
            )));
        }
        Err(e) => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Failed to read {}: {e}",
                path.display()
            )))
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/v1/records
///
/// Every recorded submission, newest first.
pub async fn handle_list_records(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionRecord>>, AppError> {
    Ok(Json(state.log.list_all().await?))
}

/// GET /api/v1/records/:id
pub async fn handle_get_record(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionRecord>, AppError> {
    let record = state
        .log
        .get_record(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Submission record {id} not found")))?;
    Ok(Json(record))
}
