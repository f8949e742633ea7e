// Submission pipeline: form validation, the generation workflow, the
// append-only submission log and the HTTP handlers on top of them.

pub mod form;
pub mod handlers;
pub mod log;
pub mod workflow;
