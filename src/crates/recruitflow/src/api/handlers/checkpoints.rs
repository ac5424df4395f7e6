//! Checkpoint audit endpoints

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::api::{
    error::ApiResult,
    models::{CheckpointResponse, CheckpointSummary, HistoryQuery},
    response,
    routes::AppState,
};

/// Checkpoints for a job, newest first
///
/// GET /api/v1/jobs/:id/checkpoints?limit=N
pub async fn list_checkpoints(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let history = app_state.service.history(&job_id, query.limit).await?;
    let summaries: Vec<CheckpointSummary> = history.iter().map(CheckpointSummary::from).collect();
    Ok(response::ok(summaries))
}

/// GET /api/v1/jobs/:id/checkpoints/:sequence
pub async fn get_checkpoint(
    State(app_state): State<AppState>,
    Path((job_id, sequence)): Path<(String, u64)>,
) -> ApiResult<impl IntoResponse> {
    let state = app_state.service.checkpoint(&job_id, sequence).await?;
    Ok(response::ok(CheckpointResponse { job_id, sequence, state }))
}
