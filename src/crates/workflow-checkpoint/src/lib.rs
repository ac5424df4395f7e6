//! # workflow-checkpoint - Durable State Snapshots for Resumable Workflows
//!
//! Append-only checkpoint storage keyed by a **thread** identifier. Every
//! transition of a workflow is persisted as a new [`Checkpoint`] carrying a
//! per-thread sequence number, which makes the log usable for:
//!
//! - **Crash Recovery** - the latest checkpoint is the only thing an engine reads on resume
//! - **Human-in-the-Loop** - a workflow parked at an interrupt can be resumed days later
//! - **Audit Trails** - historic snapshots stay addressable by sequence number
//! - **Operator Re-runs** - a failed workflow can be restarted from its last good snapshot
//!
//! ## Core Types
//!
//! - [`CheckpointStore`] - the storage trait implemented by every backend
//! - [`Checkpoint`] / [`CheckpointMetadata`] - a persisted `(thread, sequence, snapshot, written_at)` tuple
//! - [`InMemoryCheckpointStore`] - process-local backend for tests and development
//! - [`SqliteCheckpointStore`] - durable backend built on `sqlx`
//!
//! ## Guarantees
//!
//! - Sequence numbers start at `1` and strictly increase per thread, also under
//!   concurrent `save` calls.
//! - `save` never overwrites an existing sequence number.
//! - A backend that cannot persist a snapshot fails with
//!   [`CheckpointError::Write`]; it never reports success without durability.
//!
//! ## Example
//!
//! ```rust,no_run
//! use workflow_checkpoint::{CheckpointMetadata, CheckpointSource, CheckpointStore, InMemoryCheckpointStore};
//! use serde_json::json;
//!
//! # async fn demo() -> workflow_checkpoint::Result<()> {
//! let store = InMemoryCheckpointStore::new();
//! let seq = store
//!     .save("job-42", json!({"current_node": "post-job"}), CheckpointMetadata::new(CheckpointSource::Loop))
//!     .await?;
//! let latest = store.load_latest("job-42").await?;
//! assert_eq!(latest.sequence, seq);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use checkpoint::{Checkpoint, CheckpointMetadata, CheckpointSource};
pub use error::{CheckpointError, Result};
pub use memory::InMemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;
pub use traits::{CheckpointStore, CheckpointStream};
