//! Error types for recruitflow

use thiserror::Error;
use workflow_checkpoint::CheckpointError;
use workflow_core::{ValidationError, WorkflowError};

/// Result type alias for recruitflow operations
pub type Result<T> = std::result::Result<T, RecruitError>;

#[derive(Error, Debug)]
pub enum RecruitError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Opening the checkpoint store failed
    #[error("Checkpoint store error: {0}")]
    Store(#[from] CheckpointError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ValidationError> for RecruitError {
    fn from(err: ValidationError) -> Self {
        Self::Workflow(err.into())
    }
}

impl RecruitError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Workflow(e) => e.code(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::Store(_) => "CHECKPOINT_ERROR",
            Self::InvalidRequest(_) => "BAD_REQUEST",
        }
    }
}
