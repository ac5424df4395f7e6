//! Request and response bodies

use crate::state::{ApprovalStatus, CandidateRef, JobInput, WorkflowState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use workflow_checkpoint::{Checkpoint, CheckpointSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    /// Caller-chosen id; a UUID is generated when absent
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(flatten)]
    pub input: JobInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateRequest {
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddApplicantsRequest {
    pub candidates: Vec<CandidateRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub decision: ApprovalStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbandonRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerunRequest {
    pub sequence: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// One audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub sequence: u64,
    pub source: CheckpointSource,
    /// Node that produced the checkpoint
    pub node: Option<String>,
    pub note: Option<String>,
    /// Node the persisted state sits in
    pub current_node: Option<String>,
    pub written_at: DateTime<Utc>,
}

impl From<&Checkpoint> for CheckpointSummary {
    fn from(checkpoint: &Checkpoint) -> Self {
        Self {
            sequence: checkpoint.sequence,
            source: checkpoint.metadata.source,
            node: checkpoint.metadata.node.clone(),
            note: checkpoint.metadata.note.clone(),
            current_node: checkpoint
                .state
                .get("current_node")
                .and_then(|v| v.as_str())
                .map(String::from),
            written_at: checkpoint.written_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointResponse {
    pub job_id: String,
    pub sequence: u64,
    pub state: WorkflowState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
