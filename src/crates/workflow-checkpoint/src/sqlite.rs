//! SQLite-backed checkpoint storage
//!
//! Snapshots and metadata are stored as JSON text in a single
//! `workflow_checkpoints` table keyed by `(thread_id, sequence)`. The next
//! sequence number is computed and inserted by one `INSERT ... SELECT`
//! statement, so concurrent writers can never be handed the same number.

use crate::{
    checkpoint::{Checkpoint, CheckpointMetadata},
    error::{CheckpointError, Result},
    traits::{CheckpointStore, CheckpointStream},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS workflow_checkpoints (
    thread_id  TEXT    NOT NULL,
    sequence   INTEGER NOT NULL,
    state      TEXT    NOT NULL,
    metadata   TEXT    NOT NULL,
    written_at TEXT    NOT NULL,
    PRIMARY KEY (thread_id, sequence)
)";

/// Durable checkpoint store on top of an sqlx SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// Open (creating if missing) a database file
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CheckpointError::Invalid(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Read(format!("Failed to connect to database: {}", e)))?;

        info!(path = %path.display(), "Checkpoint database opened");
        Self::with_pool(pool).await
    }

    /// Connect using an sqlx connection URL such as `sqlite::memory:`
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| CheckpointError::Invalid(format!("Invalid database url: {}", e)))?
            .create_if_missing(true);

        // Every connection to `:memory:` is a separate database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Read(format!("Failed to connect to database: {}", e)))?;

        debug!(url = %url, "Checkpoint database connected");
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool and ensure the schema exists
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| CheckpointError::Invalid(format!("Failed to create schema: {}", e)))?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn decode_row(row: &SqliteRow) -> Result<Checkpoint> {
        let read = |e: sqlx::Error| CheckpointError::Read(e.to_string());

        let sequence: i64 = row.try_get("sequence").map_err(read)?;
        let state: String = row.try_get("state").map_err(read)?;
        let metadata: String = row.try_get("metadata").map_err(read)?;
        let written_at: String = row.try_get("written_at").map_err(read)?;

        Ok(Checkpoint {
            thread_id: row.try_get("thread_id").map_err(read)?,
            sequence: u64::try_from(sequence)
                .map_err(|_| CheckpointError::Invalid(format!("negative sequence {}", sequence)))?,
            state: serde_json::from_str(&state)?,
            metadata: serde_json::from_str(&metadata)?,
            written_at: DateTime::parse_from_rfc3339(&written_at)
                .map_err(|e| CheckpointError::Invalid(format!("bad timestamp: {}", e)))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, thread_id: &str, state: Value, metadata: CheckpointMetadata) -> Result<u64> {
        if thread_id.is_empty() {
            return Err(CheckpointError::Invalid("thread_id is required".to_string()));
        }

        let state = serde_json::to_string(&state)?;
        let metadata = serde_json::to_string(&metadata)?;
        let written_at = Utc::now().to_rfc3339();

        let sequence: i64 = sqlx::query_scalar(
            "INSERT INTO workflow_checkpoints (thread_id, sequence, state, metadata, written_at)
             SELECT ?, COALESCE(MAX(sequence), 0) + 1, ?, ?, ?
             FROM workflow_checkpoints WHERE thread_id = ?
             RETURNING sequence",
        )
        .bind(thread_id)
        .bind(&state)
        .bind(&metadata)
        .bind(&written_at)
        .bind(thread_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CheckpointError::write(thread_id, e))?;

        debug!(thread_id = %thread_id, sequence, "Checkpoint appended");
        u64::try_from(sequence).map_err(|_| CheckpointError::write(thread_id, "negative sequence"))
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Checkpoint> {
        let row = sqlx::query(
            "SELECT * FROM workflow_checkpoints WHERE thread_id = ? ORDER BY sequence DESC LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CheckpointError::Read(e.to_string()))?;

        match row {
            Some(row) => Self::decode_row(&row),
            None => Err(CheckpointError::not_found(thread_id)),
        }
    }

    async fn load_at(&self, thread_id: &str, sequence: u64) -> Result<Checkpoint> {
        let seq = i64::try_from(sequence)
            .map_err(|_| CheckpointError::not_found_at(thread_id, sequence))?;
        let row = sqlx::query("SELECT * FROM workflow_checkpoints WHERE thread_id = ? AND sequence = ?")
            .bind(thread_id)
            .bind(seq)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CheckpointError::Read(e.to_string()))?;

        match row {
            Some(row) => Self::decode_row(&row),
            None => Err(CheckpointError::not_found_at(thread_id, sequence)),
        }
    }

    async fn latest_sequence(&self, thread_id: &str) -> Result<Option<u64>> {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(sequence) FROM workflow_checkpoints WHERE thread_id = ?")
                .bind(thread_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| CheckpointError::Read(e.to_string()))?;

        Ok(max.and_then(|m| u64::try_from(m).ok()))
    }

    async fn list(&self, thread_id: &str, limit: Option<usize>) -> Result<CheckpointStream> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = sqlx::query(
            "SELECT * FROM workflow_checkpoints WHERE thread_id = ? ORDER BY sequence DESC LIMIT ?",
        )
        .bind(thread_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CheckpointError::Read(e.to_string()))?;

        let results: Vec<Result<Checkpoint>> = rows.iter().map(Self::decode_row).collect();
        Ok(Box::pin(stream::iter(results)))
    }
}
