//! Checkpoint data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What caused a checkpoint to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Initial snapshot of a new thread
    Input,
    /// Written by the execution loop after a node transition
    Loop,
    /// External update applied on resume
    Update,
    /// Halt on a node failure
    Error,
    /// Out-of-band abandonment
    Abandon,
    /// Operator re-run from a historic snapshot
    Rerun,
}

impl fmt::Display for CheckpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Input => "input",
            Self::Loop => "loop",
            Self::Update => "update",
            Self::Error => "error",
            Self::Abandon => "abandon",
            Self::Rerun => "rerun",
        };
        f.write_str(s)
    }
}

/// Metadata recorded alongside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    /// Node that produced the snapshot, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// Free-form annotation (error cause, abandon reason, rerun origin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CheckpointMetadata {
    pub fn new(source: CheckpointSource) -> Self {
        Self {
            source,
            node: None,
            note: None,
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A persisted snapshot of one thread's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    /// Strictly increasing per thread, starting at 1
    pub sequence: u64,
    pub state: Value,
    pub metadata: CheckpointMetadata,
    pub written_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Deserialize the snapshot into a typed state
    pub fn decode<S: serde::de::DeserializeOwned>(&self) -> crate::Result<S> {
        Ok(serde_json::from_value(self.state.clone())?)
    }
}
