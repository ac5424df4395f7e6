use crate::api::{models::HealthResponse, response};
use axum::response::IntoResponse;

/// GET /health
pub async fn health() -> impl IntoResponse {
    response::ok(HealthResponse::ok())
}
