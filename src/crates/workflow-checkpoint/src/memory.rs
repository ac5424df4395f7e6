//! In-memory checkpoint storage for development and testing
//!
//! [`InMemoryCheckpointStore`] keeps every thread's log in a
//! `Arc<RwLock<HashMap<thread_id, Vec<Checkpoint>>>>`. Sequence numbers are
//! assigned under the write lock, so concurrent saves on one thread are
//! serialized and stay strictly increasing. Data is lost when the process
//! exits; use [`SqliteCheckpointStore`](crate::SqliteCheckpointStore) for
//! durability.

use crate::{
    checkpoint::{Checkpoint, CheckpointMetadata},
    error::{CheckpointError, Result},
    traits::{CheckpointStore, CheckpointStream},
};
use async_trait::async_trait;
use chrono::Utc;
use futures::stream;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Thread-safe in-memory checkpoint storage
type CheckpointLog = Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>;

/// In-memory checkpoint store
///
/// Cloning is cheap and clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    log: CheckpointLog,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads with at least one checkpoint
    pub async fn thread_count(&self) -> usize {
        self.log.read().await.len()
    }

    /// Total number of checkpoints across all threads
    pub async fn checkpoint_count(&self) -> usize {
        self.log.read().await.values().map(Vec::len).sum()
    }

    /// Drop every checkpoint (test isolation)
    pub async fn clear(&self) {
        self.log.write().await.clear();
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, thread_id: &str, state: Value, metadata: CheckpointMetadata) -> Result<u64> {
        if thread_id.is_empty() {
            return Err(CheckpointError::Invalid("thread_id is required".to_string()));
        }

        let mut log = self.log.write().await;
        let entries = log.entry(thread_id.to_string()).or_default();
        let sequence = entries.last().map(|cp| cp.sequence).unwrap_or(0) + 1;

        entries.push(Checkpoint {
            thread_id: thread_id.to_string(),
            sequence,
            state,
            metadata,
            written_at: Utc::now(),
        });

        debug!(thread_id = %thread_id, sequence, "Checkpoint appended");
        Ok(sequence)
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Checkpoint> {
        self.log
            .read()
            .await
            .get(thread_id)
            .and_then(|entries| entries.last().cloned())
            .ok_or_else(|| CheckpointError::not_found(thread_id))
    }

    async fn load_at(&self, thread_id: &str, sequence: u64) -> Result<Checkpoint> {
        self.log
            .read()
            .await
            .get(thread_id)
            .and_then(|entries| entries.iter().find(|cp| cp.sequence == sequence).cloned())
            .ok_or_else(|| CheckpointError::not_found_at(thread_id, sequence))
    }

    async fn latest_sequence(&self, thread_id: &str) -> Result<Option<u64>> {
        Ok(self
            .log
            .read()
            .await
            .get(thread_id)
            .and_then(|entries| entries.last().map(|cp| cp.sequence)))
    }

    async fn list(&self, thread_id: &str, limit: Option<usize>) -> Result<CheckpointStream> {
        let log = self.log.read().await;
        let results: Vec<Result<Checkpoint>> = log
            .get(thread_id)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .map(Ok)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Box::pin(stream::iter(results)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointSource;
    use futures::StreamExt;
    use serde_json::json;

    fn meta() -> CheckpointMetadata {
        CheckpointMetadata::new(CheckpointSource::Loop)
    }

    #[tokio::test]
    async fn test_save_and_load_latest() {
        let store = InMemoryCheckpointStore::new();
        let first = store.save("job-1", json!({"n": 1}), meta()).await.unwrap();
        let second = store.save("job-1", json!({"n": 2}), meta()).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let latest = store.load_latest("job-1").await.unwrap();
        assert_eq!(latest.sequence, 2);
        assert_eq!(latest.state, json!({"n": 2}));
    }

    #[tokio::test]
    async fn test_load_at_keeps_history() {
        let store = InMemoryCheckpointStore::new();
        for n in 1..=3 {
            store.save("job-1", json!({"n": n}), meta()).await.unwrap();
        }

        let cp = store.load_at("job-1", 2).await.unwrap();
        assert_eq!(cp.state, json!({"n": 2}));

        let missing = store.load_at("job-1", 9).await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_thread_is_not_found() {
        let store = InMemoryCheckpointStore::new();
        assert!(store.load_latest("job-x").await.unwrap_err().is_not_found());
        assert_eq!(store.latest_sequence("job-x").await.unwrap(), None);
        assert!(!store.thread_exists("job-x").await.unwrap());
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let store = InMemoryCheckpointStore::new();
        store.save("job-a", json!({}), meta()).await.unwrap();
        store.save("job-a", json!({}), meta()).await.unwrap();
        let b = store.save("job-b", json!({}), meta()).await.unwrap();

        assert_eq!(b, 1);
        assert_eq!(store.thread_count().await, 2);
        assert_eq!(store.checkpoint_count().await, 3);

        store.clear().await;
        assert_eq!(store.checkpoint_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let store = InMemoryCheckpointStore::new();
        for n in 1..=5 {
            store.save("job-1", json!({"n": n}), meta()).await.unwrap();
        }

        let seqs: Vec<u64> = store
            .list("job-1", Some(3))
            .await
            .unwrap()
            .map(|cp| cp.unwrap().sequence)
            .collect()
            .await;
        assert_eq!(seqs, vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn test_empty_thread_id_rejected() {
        let store = InMemoryCheckpointStore::new();
        let err = store.save("", json!({}), meta()).await.unwrap_err();
        assert!(matches!(err, CheckpointError::Invalid(_)));
    }
}
