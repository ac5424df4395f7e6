//! Job lifecycle endpoints
//!
//! Every decision endpoint resumes the job's thread and answers with the
//! resulting [`JobStatus`](crate::service::JobStatus).

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};

use crate::api::{
    error::ApiResult,
    models::{AbandonRequest, AddApplicantsRequest, CreateJobRequest, RegenerateRequest, RerunRequest, ReviewRequest},
    response,
    routes::AppState,
};

/// Create a job and run it to the description approval
///
/// POST /api/v1/jobs
pub async fn create_job(
    State(app_state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let status = match req.job_id {
        Some(job_id) => app_state.service.create_job_with_id(&job_id, req.input).await?,
        None => app_state.service.create_job(req.input).await?,
    };
    Ok(response::created(status))
}

/// GET /api/v1/jobs/:id
pub async fn get_job(State(app_state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let state = app_state.service.job_state(&job_id).await?;
    Ok(response::ok(state))
}

/// GET /api/v1/jobs/:id/status
pub async fn job_status(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let status = app_state.service.job_status(&job_id).await?;
    Ok(response::ok(status))
}

/// POST /api/v1/jobs/:id/description/approve
pub async fn approve_description(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let status = app_state.service.approve_description(&job_id).await?;
    Ok(response::ok(status))
}

/// POST /api/v1/jobs/:id/description/regenerate
pub async fn regenerate_description(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
    payload: Result<Json<RegenerateRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let status = app_state.service.regenerate_description(&job_id, &req.feedback).await?;
    Ok(response::ok(status))
}

/// POST /api/v1/jobs/:id/applicants
pub async fn add_applicants(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
    payload: Result<Json<AddApplicantsRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let status = app_state.service.add_applicants(&job_id, req.candidates).await?;
    Ok(response::ok(status))
}

/// POST /api/v1/jobs/:id/shortlist/approve
pub async fn approve_shortlist(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let status = app_state.service.approve_shortlist(&job_id).await?;
    Ok(response::ok(status))
}

/// POST /api/v1/jobs/:id/shortlist/reject
pub async fn reject_shortlist(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let status = app_state.service.reject_shortlist(&job_id).await?;
    Ok(response::ok(status))
}

/// POST /api/v1/jobs/:id/review
pub async fn record_review(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let status = app_state.service.record_review(&job_id, req.decision).await?;
    Ok(response::ok(status))
}

/// Re-run the interrupt the job is parked at with no changes
///
/// POST /api/v1/jobs/:id/nudge
pub async fn nudge_job(State(app_state): State<AppState>, Path(job_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let status = app_state.service.nudge(&job_id).await?;
    Ok(response::ok(status))
}

/// POST /api/v1/jobs/:id/abandon
pub async fn abandon_job(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
    payload: Result<Json<AbandonRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let reason = req.reason.unwrap_or_else(|| "abandoned by operator".to_string());
    let status = app_state.service.abandon_job(&job_id, &reason).await?;
    Ok(response::ok(status))
}

/// POST /api/v1/jobs/:id/rerun
pub async fn rerun_job(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
    payload: Result<Json<RerunRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    tracing::info!(job_id = %job_id, sequence = req.sequence, "Operator re-run requested");
    let status = app_state.service.rerun_job(&job_id, req.sequence).await?;
    Ok(response::ok(status))
}

/// POST /api/v1/jobs/:id/recover
pub async fn recover_job(
    State(app_state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let status = app_state.service.recover_job(&job_id).await?;
    Ok(response::ok(status))
}
