use std::sync::Arc;

use crate::config::Config;
use crate::submission::log::SubmissionLog;
use crate::submission::workflow::SubmissionWorkflow;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<SubmissionWorkflow>,
    /// Same log the workflow records into; used by the read-only listing.
    pub log: Arc<dyn SubmissionLog>,
    pub config: Config,
}
