//! Submission workflow. Orchestrates one end-to-end document generation.
//!
//! Flow per document: copy template → substitute → export → delete copy.
//! After every document is produced: record the submission (best-effort).
//!
//! Documents of one submission succeed or fail together. A failing document
//! aborts the submission and removes files already produced for it. Cleanup
//! and recording failures never fail a submission; they become warnings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::DocumentTarget;
use crate::docs_client::DocumentService;
use crate::documents::copy_manager::{
    create_working_copy, delete_working_copy, keep_working_copy, WorkingCopy,
};
use crate::documents::exporter::export_to_file;
use crate::documents::substitution::substitute;
use crate::documents::{DocumentError, DocumentKind};
use crate::models::fields::FieldValues;
use crate::submission::log::SubmissionLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    CopyingTemplate,
    Substituting,
    Exporting,
    CleaningUp,
    Recording,
    Done,
    Errored,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkflowState::Idle => "idle",
            WorkflowState::CopyingTemplate => "copying the template",
            WorkflowState::Substituting => "filling in the placeholders",
            WorkflowState::Exporting => "exporting the PDF",
            WorkflowState::CleaningUp => "deleting the working copy",
            WorkflowState::Recording => "recording the submission",
            WorkflowState::Done => "done",
            WorkflowState::Errored => "errored",
        })
    }
}

/// A non-fatal problem. The generated files are still delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionWarning {
    CleanupFailed {
        document: DocumentKind,
        message: String,
    },
    RecordPersistFailed {
        message: String,
    },
}

impl fmt::Display for SubmissionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionWarning::CleanupFailed { document, message } => {
                write!(f, "the {document} working copy could not be deleted ({message})")
            }
            SubmissionWarning::RecordPersistFailed { message } => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProducedFile {
    pub document: DocumentKind,
    pub filename: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub bytes: u64,
    pub placeholders_replaced: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub submission_id: Uuid,
    pub state: WorkflowState,
    pub files: Vec<ProducedFile>,
    pub record_id: Option<i32>,
    pub warnings: Vec<SubmissionWarning>,
}

impl SubmissionOutcome {
    /// Files were produced, but something non-fatal went wrong.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn message(&self) -> String {
        if !self.is_partial() {
            return "Documents generated successfully".to_string();
        }
        let details: Vec<String> = self.warnings.iter().map(ToString::to_string).collect();
        format!("Documents generated, with warnings: {}", details.join("; "))
    }
}

#[derive(Debug, Error)]
#[error("{document} generation failed while {stage}: {error}")]
pub struct SubmissionFailure {
    pub submission_id: Uuid,
    pub document: DocumentKind,
    pub stage: WorkflowState,
    #[source]
    pub error: DocumentError,
    pub warnings: Vec<SubmissionWarning>,
}

/// Output location of one document of one submission.
pub fn submission_file_path(output_dir: &Path, submission_id: Uuid, filename: &str) -> PathBuf {
    output_dir.join(submission_id.to_string()).join(filename)
}

/// Per-submission progress. `Errored` is absorbing.
struct SubmissionRun {
    id: Uuid,
    state: WorkflowState,
    failed_at: Option<WorkflowState>,
    files: Vec<ProducedFile>,
    warnings: Vec<SubmissionWarning>,
}

impl SubmissionRun {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            state: WorkflowState::Idle,
            failed_at: None,
            files: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn enter(&mut self, next: WorkflowState) {
        if self.state == WorkflowState::Errored {
            return;
        }
        debug!(submission_id = %self.id, "{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self) {
        if self.state != WorkflowState::Errored {
            self.failed_at = Some(self.state);
            self.state = WorkflowState::Errored;
        }
    }
}

pub struct SubmissionWorkflow {
    service: Arc<dyn DocumentService>,
    log: Arc<dyn SubmissionLog>,
    documents: Vec<DocumentTarget>,
    output_dir: PathBuf,
}

impl SubmissionWorkflow {
    pub fn new(
        service: Arc<dyn DocumentService>,
        log: Arc<dyn SubmissionLog>,
        documents: Vec<DocumentTarget>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            service,
            log,
            documents,
            output_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Runs one submission. No retries: a failed submission must be resubmitted.
    pub async fn run(&self, values: &FieldValues) -> Result<SubmissionOutcome, SubmissionFailure> {
        let mut run = SubmissionRun::new(Uuid::new_v4());
        info!(
            submission_id = %run.id,
            "Generating {} document(s) for {} / {}",
            self.documents.len(),
            values.get_or_empty("entreprise"),
            values.get_or_empty("poste")
        );

        for target in &self.documents {
            match self.render_document(&mut run, target, values).await {
                Ok(file) => run.files.push(file),
                Err(error) => {
                    let stage = run.failed_at.unwrap_or(run.state);
                    error!(submission_id = %run.id, "{} failed while {stage}: {error}", target.kind);
                    self.discard_outputs(run.id).await;
                    return Err(SubmissionFailure {
                        submission_id: run.id,
                        document: target.kind,
                        stage,
                        error,
                        warnings: run.warnings,
                    });
                }
            }
        }

        run.enter(WorkflowState::Recording);
        let record_id = self.log.append_record(values).await;
        if record_id.is_none() {
            warn!(submission_id = %run.id, "Documents generated but the submission was not recorded");
            run.warnings.push(SubmissionWarning::RecordPersistFailed {
                message: "the submission could not be saved to the history".to_string(),
            });
        }

        run.enter(WorkflowState::Done);
        for file in &run.files {
            debug!(submission_id = %run.id, "{} ready at {}", file.document, file.path.display());
        }
        info!(
            submission_id = %run.id,
            "Submission done: {} file(s), {} warning(s)",
            run.files.len(),
            run.warnings.len()
        );
        Ok(SubmissionOutcome {
            submission_id: run.id,
            state: run.state,
            files: run.files,
            record_id,
            warnings: run.warnings,
        })
    }

    /// One document's copy → substitute → export → cleanup sequence.
    async fn render_document(
        &self,
        run: &mut SubmissionRun,
        target: &DocumentTarget,
        values: &FieldValues,
    ) -> Result<ProducedFile, DocumentError> {
        run.enter(WorkflowState::CopyingTemplate);
        let copy = match create_working_copy(self.service.as_ref(), &target.template).await {
            Ok(copy) => copy,
            Err(e) => {
                run.fail();
                return Err(e);
            }
        };

        let produced = self.fill_and_export(run, &copy, target, values).await;
        let resolves_to_template = match &produced {
            Ok(_) => false,
            Err(e) => {
                run.fail();
                e.resolves_to_template(copy.template())
            }
        };
        if resolves_to_template {
            keep_working_copy(copy);
            return produced;
        }

        run.enter(WorkflowState::CleaningUp);
        if let Err(e) = delete_working_copy(self.service.as_ref(), copy).await {
            run.warnings.push(SubmissionWarning::CleanupFailed {
                document: target.kind,
                message: e.to_string(),
            });
        }

        produced
    }

    async fn fill_and_export(
        &self,
        run: &mut SubmissionRun,
        copy: &WorkingCopy,
        target: &DocumentTarget,
        values: &FieldValues,
    ) -> Result<ProducedFile, DocumentError> {
        run.enter(WorkflowState::Substituting);
        let report = substitute(self.service.as_ref(), copy.handle(), values, copy.template()).await?;

        run.enter(WorkflowState::Exporting);
        let path = submission_file_path(&self.output_dir, run.id, &target.output_filename);
        let bytes = export_to_file(self.service.as_ref(), copy.handle(), &path).await?;

        Ok(ProducedFile {
            document: target.kind,
            filename: target.output_filename.clone(),
            path,
            bytes,
            placeholders_replaced: report.occurrences_changed,
        })
    }

    /// Removes every file of a failed submission.
    async fn discard_outputs(&self, submission_id: Uuid) {
        let dir = self.output_dir.join(submission_id.to_string());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!("Removed partial outputs in {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove partial outputs in {}: {e}", dir.display()),
        }
    }
}
