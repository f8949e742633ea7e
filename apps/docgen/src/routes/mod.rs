pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::submission::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/skills", get(handlers::handle_list_skills))
        .route(
            "/api/v1/submissions",
            post(handlers::handle_create_submission),
        )
        .route(
            "/api/v1/submissions/:submission_id/files/:filename",
            get(handlers::handle_download),
        )
        .route("/api/v1/records", get(handlers::handle_list_records))
        .route("/api/v1/records/:id", get(handlers::handle_get_record))
        .with_state(state)
}
