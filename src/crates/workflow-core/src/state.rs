//! Contract between the engine and a domain state type

use crate::error::ValidationError;
use serde::{de::DeserializeOwned, Serialize};

/// An immutable, validated workflow snapshot.
///
/// Every method returning `Self` is a copy-with-update: the receiver is never
/// modified and the returned snapshot has already passed validation. The
/// engine only moves a thread forward through these methods, so a snapshot
/// that reaches the checkpoint store is always valid.
pub trait GraphState: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// External changes accepted on resume (human decisions)
    type Update: Send + Sync;

    /// Checkpoint partition key
    fn thread_id(&self) -> &str;

    /// Node the snapshot currently sits in
    fn current_node(&self) -> &str;

    fn error_message(&self) -> Option<&str>;

    /// Copy positioned at `node`
    fn with_current_node(&self, node: &str) -> Result<Self, ValidationError>;

    /// Copy halted at `error_node` with `message` recorded
    fn with_error(&self, error_node: &str, message: &str) -> Result<Self, ValidationError>;

    /// Copy with an external update applied
    fn apply_update(&self, update: &Self::Update) -> Result<Self, ValidationError>;
}
