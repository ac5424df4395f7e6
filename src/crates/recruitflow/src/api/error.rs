//! API error types and HTTP response conversion
//!
//! Engine errors keep their stable code in the response body; the HTTP
//! status reflects whether the caller can do anything about them.

use crate::error::RecruitError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use workflow_checkpoint::CheckpointError;
use workflow_core::WorkflowError;

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body parsed but violates the schema
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Workflow(e) => match e {
                WorkflowError::NotFound(_) | WorkflowError::Checkpoint(CheckpointError::NotFound { .. }) => {
                    StatusCode::NOT_FOUND
                }
                WorkflowError::LockContention { .. }
                | WorkflowError::LockExpired { .. }
                | WorkflowError::Abandoned(_)
                | WorkflowError::Terminal { .. }
                | WorkflowError::NotResumable { .. } => StatusCode::CONFLICT,
                WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Workflow(e) => e.code(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "NotFound",
            StatusCode::BAD_REQUEST => "BadRequest",
            StatusCode::UNPROCESSABLE_ENTITY => "ValidationError",
            StatusCode::CONFLICT => "Conflict",
            _ => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());

        if status.is_server_error() {
            tracing::error!(code = %body.code, message = %body.message, "API error");
        } else {
            tracing::debug!(code = %body.code, message = %body.message, "API request rejected");
        }

        (status, Json(body)).into_response()
    }
}

impl From<RecruitError> for ApiError {
    fn from(err: RecruitError) -> Self {
        match err {
            RecruitError::Workflow(e) => ApiError::Workflow(e),
            RecruitError::InvalidRequest(message) => ApiError::BadRequest(message),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::ValidationError(e.body_text()),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}
