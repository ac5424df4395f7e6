//! Storage trait implemented by every checkpoint backend

use crate::{
    checkpoint::{Checkpoint, CheckpointMetadata},
    error::Result,
};
use async_trait::async_trait;
use futures::stream::Stream;
use serde_json::Value;
use std::pin::Pin;

/// Stream of checkpoints, newest first
pub type CheckpointStream = Pin<Box<dyn Stream<Item = Result<Checkpoint>> + Send + 'static>>;

/// Append-only, per-thread checkpoint log.
///
/// Implementations must assign sequence numbers atomically: two concurrent
/// `save` calls on one thread never receive the same number, and a returned
/// sequence is always greater than every sequence previously stored for that
/// thread.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Append a snapshot and return its sequence number.
    ///
    /// Fails with [`CheckpointError::Write`](crate::CheckpointError::Write)
    /// when the snapshot could not be persisted.
    async fn save(&self, thread_id: &str, state: Value, metadata: CheckpointMetadata) -> Result<u64>;

    /// Highest-sequence checkpoint of the thread
    async fn load_latest(&self, thread_id: &str) -> Result<Checkpoint>;

    /// Checkpoint at an exact sequence number
    async fn load_at(&self, thread_id: &str, sequence: u64) -> Result<Checkpoint>;

    /// Highest sequence number of the thread, `None` for unknown threads
    async fn latest_sequence(&self, thread_id: &str) -> Result<Option<u64>>;

    /// Checkpoints of the thread, newest first
    async fn list(&self, thread_id: &str, limit: Option<usize>) -> Result<CheckpointStream>;

    async fn thread_exists(&self, thread_id: &str) -> Result<bool> {
        Ok(self.latest_sequence(thread_id).await?.is_some())
    }
}
