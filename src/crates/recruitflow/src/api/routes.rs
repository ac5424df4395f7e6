//! API route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::{error::ApiError, handlers, middleware::logging_layer};
use crate::service::RecruitmentService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: RecruitmentService,
}

/// Build the complete API router
pub fn create_router(service: RecruitmentService) -> Router {
    let app_state = AppState { service };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/jobs", post(handlers::create_job))
        .route("/api/v1/jobs/:id", get(handlers::get_job))
        .route("/api/v1/jobs/:id/status", get(handlers::job_status))
        // Human decisions
        .route("/api/v1/jobs/:id/description/approve", post(handlers::approve_description))
        .route("/api/v1/jobs/:id/description/regenerate", post(handlers::regenerate_description))
        .route("/api/v1/jobs/:id/applicants", post(handlers::add_applicants))
        .route("/api/v1/jobs/:id/shortlist/approve", post(handlers::approve_shortlist))
        .route("/api/v1/jobs/:id/shortlist/reject", post(handlers::reject_shortlist))
        .route("/api/v1/jobs/:id/review", post(handlers::record_review))
        // Operator controls
        .route("/api/v1/jobs/:id/nudge", post(handlers::nudge_job))
        .route("/api/v1/jobs/:id/abandon", post(handlers::abandon_job))
        .route("/api/v1/jobs/:id/rerun", post(handlers::rerun_job))
        .route("/api/v1/jobs/:id/recover", post(handlers::recover_job))
        // Audit
        .route("/api/v1/jobs/:id/checkpoints", get(handlers::list_checkpoints))
        .route("/api/v1/jobs/:id/checkpoints/:sequence", get(handlers::get_checkpoint))
        .fallback(|| async { ApiError::NotFound("no such route".to_string()) })
        .layer(logging_layer())
        .with_state(app_state)
}
