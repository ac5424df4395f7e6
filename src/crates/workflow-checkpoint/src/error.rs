//! Error types for checkpoint operations

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors that can occur during checkpoint operations
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// No checkpoint exists for the thread (or at the requested sequence)
    #[error("Checkpoint not found: {thread_id}{}", sequence_suffix(.sequence))]
    NotFound {
        thread_id: String,
        sequence: Option<u64>,
    },

    /// The snapshot could not be durably written
    #[error("Checkpoint write failed for {thread_id}: {reason}")]
    Write { thread_id: String, reason: String },

    /// The backend could not be read
    #[error("Checkpoint read failed: {0}")]
    Read(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid checkpoint or argument
    #[error("Invalid checkpoint: {0}")]
    Invalid(String),
}

fn sequence_suffix(sequence: &Option<u64>) -> String {
    sequence.map(|s| format!(" @ {}", s)).unwrap_or_default()
}

impl CheckpointError {
    pub fn not_found(thread_id: impl Into<String>) -> Self {
        Self::NotFound {
            thread_id: thread_id.into(),
            sequence: None,
        }
    }

    pub fn not_found_at(thread_id: impl Into<String>, sequence: u64) -> Self {
        Self::NotFound {
            thread_id: thread_id.into(),
            sequence: Some(sequence),
        }
    }

    pub fn write(thread_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Write {
            thread_id: thread_id.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the `NotFound` variant
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
