//! HTTP adapter over [`RecruitmentService`](crate::service::RecruitmentService)
//!
//! Responses are wrapped as `{"success": true, "data": ...}`; failures come
//! back as `{"error", "message", "code"}` with a status derived from the
//! engine error.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use response::SuccessResponse;
pub use routes::{create_router, AppState};
