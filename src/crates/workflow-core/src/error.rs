//! Error taxonomy for graph execution
//!
//! [`WorkflowError`] is the root of every failure the engine can report.
//! Nodes raise [`StageError`]s (collaborator failures inside one pipeline
//! stage) or [`ValidationError`]s (a copy-with-update broke an invariant).
//! The engine wraps unexpected node failures into a [`GraphExecutionError`]
//! that records which node failed and which checkpoint is the last good one.
//!
//! Propagation rules:
//!
//! - `Validation` and `InvalidTransition` indicate logic defects; they are
//!   returned unchanged and never retried.
//! - Everything a node raises is recorded into an error checkpoint; recovery
//!   is an explicit operator re-run from an earlier checkpoint.

use std::fmt;
use thiserror::Error;
use workflow_checkpoint::CheckpointError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// A state update or node output violated a schema invariant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid state: {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Pipeline stage that raised a [`StageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Generation,
    Posting,
    Monitoring,
    Ranking,
    Prescreening,
    Scheduling,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Generation => "Description generation",
            Self::Posting => "Job posting",
            Self::Monitoring => "Application monitoring",
            Self::Ranking => "Candidate ranking",
            Self::Prescreening => "Prescreening",
            Self::Scheduling => "Interview scheduling",
        };
        f.write_str(s)
    }
}

/// A collaborator call inside a stage failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} failed: {message}")]
pub struct StageError {
    pub kind: StageKind,
    pub message: String,
}

impl StageError {
    pub fn new(kind: StageKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::new(StageKind::Generation, message)
    }

    pub fn posting(message: impl Into<String>) -> Self {
        Self::new(StageKind::Posting, message)
    }

    pub fn monitoring(message: impl Into<String>) -> Self {
        Self::new(StageKind::Monitoring, message)
    }

    pub fn ranking(message: impl Into<String>) -> Self {
        Self::new(StageKind::Ranking, message)
    }

    pub fn prescreening(message: impl Into<String>) -> Self {
        Self::new(StageKind::Prescreening, message)
    }

    pub fn scheduling(message: impl Into<String>) -> Self {
        Self::new(StageKind::Scheduling, message)
    }
}

/// A node failed and the engine halted the thread
#[derive(Error, Debug)]
#[error("Node '{node}' failed after checkpoint {last_checkpoint}: {source}")]
pub struct GraphExecutionError {
    /// Node that was executing
    pub node: String,
    /// Last checkpoint written before the failure
    pub last_checkpoint: u64,
    /// Error checkpoint recording the halt
    pub error_checkpoint: Option<u64>,
    pub source: Box<WorkflowError>,
}

/// Root error type
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Execution(#[from] GraphExecutionError),

    /// Router produced a key missing from the node's route map
    #[error("Invalid transition from '{node}': route '{route_key}' is not one of [{}]", allowed.join(", "))]
    InvalidTransition {
        node: String,
        route_key: String,
        allowed: Vec<String>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Stage(#[from] StageError),

    /// A feature-flagged-off capability was invoked
    #[error("Capability '{capability}' is not available for node '{node}'")]
    UnsupportedCapability { capability: String, node: String },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Thread '{thread_id}' is locked by another execution")]
    LockContention { thread_id: String },

    #[error("Lease on thread '{thread_id}' expired before the checkpoint was written")]
    LockExpired { thread_id: String },

    #[error("Node '{node}' timed out after {timeout_ms}ms")]
    Timeout { node: String, timeout_ms: u64 },

    #[error("Thread not found: {0}")]
    NotFound(String),

    #[error("Thread '{0}' was abandoned")]
    Abandoned(String),

    #[error("Thread '{thread_id}' already finished at '{node}'")]
    Terminal { thread_id: String, node: String },

    #[error("Thread '{thread_id}' is at '{node}', which does not accept updates")]
    NotResumable { thread_id: String, node: String },

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Step limit of {0} reached without hitting an interrupt")]
    StepLimit(usize),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// Logic defects must reach operators unchanged
    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidTransition { .. })
    }

    /// Whether re-running the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Execution(e) => e.source.is_retryable(),
            Self::Stage(_) | Self::Timeout { .. } | Self::LockContention { .. } | Self::LockExpired { .. } => {
                true
            }
            Self::Checkpoint(e) => matches!(e, CheckpointError::Write { .. } | CheckpointError::Read(_)),
            _ => false,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Execution(_) => "EXECUTION_FAILED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Stage(_) => "STAGE_FAILED",
            Self::UnsupportedCapability { .. } => "UNSUPPORTED_CAPABILITY",
            Self::Checkpoint(CheckpointError::NotFound { .. }) => "CHECKPOINT_NOT_FOUND",
            Self::Checkpoint(_) => "CHECKPOINT_ERROR",
            Self::LockContention { .. } => "LOCK_CONTENTION",
            Self::LockExpired { .. } => "LOCK_EXPIRED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Abandoned(_) => "ABANDONED",
            Self::Terminal { .. } => "TERMINAL",
            Self::NotResumable { .. } => "NOT_RESUMABLE",
            Self::UnknownNode(_) => "UNKNOWN_NODE",
            Self::StepLimit(_) => "STEP_LIMIT",
            Self::Graph(_) => "GRAPH_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
