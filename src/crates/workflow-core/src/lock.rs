//! Per-thread execution leases
//!
//! At most one execution may drive a thread at a time. A [`Lease`] is held
//! for the whole execution loop and carries an expiry, so a crashed holder
//! cannot block a thread forever: once the TTL passes, the next `acquire`
//! takes the lease over.

use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Poll interval while waiting for a held lease
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Proof of exclusive access to a key until `expires_at`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub key: String,
    pub token: String,
    pub expires_at: Instant,
}

impl Lease {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Distributed lock capability
#[async_trait]
pub trait LockService: Send + Sync {
    /// Take the lease or fail immediately with `LockContention`
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Lease>;

    /// Give the lease back. Returns `false` when the lease had already been
    /// lost (expired and taken over, or never held).
    async fn release(&self, lease: &Lease) -> bool;

    /// Keep retrying `acquire` until `wait` has elapsed
    async fn acquire_within(&self, key: &str, ttl: Duration, wait: Duration) -> Result<Lease> {
        let deadline = Instant::now() + wait;
        loop {
            match self.acquire(key, ttl).await {
                Err(WorkflowError::LockContention { .. }) if Instant::now() < deadline => {
                    sleep(WAIT_POLL_INTERVAL).await;
                }
                other => return other,
            }
        }
    }
}

#[derive(Debug)]
struct Holder {
    token: String,
    expires_at: Instant,
}

/// Process-local lock service
#[derive(Debug, Clone, Default)]
pub struct InMemoryLockService {
    holders: Arc<Mutex<HashMap<String, Holder>>>,
}

impl InMemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live lease exists for `key`
    pub async fn is_locked(&self, key: &str) -> bool {
        self.holders
            .lock()
            .await
            .get(key)
            .map(|h| h.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

#[async_trait]
impl LockService for InMemoryLockService {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Lease> {
        let mut holders = self.holders.lock().await;
        let now = Instant::now();

        if let Some(holder) = holders.get(key) {
            if holder.expires_at > now {
                return Err(WorkflowError::LockContention {
                    thread_id: key.to_string(),
                });
            }
            warn!(key = %key, "Taking over expired lease");
        }

        let lease = Lease {
            key: key.to_string(),
            token: Uuid::new_v4().to_string(),
            expires_at: now + ttl,
        };
        holders.insert(
            key.to_string(),
            Holder {
                token: lease.token.clone(),
                expires_at: lease.expires_at,
            },
        );

        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Lease acquired");
        Ok(lease)
    }

    async fn release(&self, lease: &Lease) -> bool {
        let mut holders = self.holders.lock().await;
        match holders.get(&lease.key) {
            Some(holder) if holder.token == lease.token => {
                holders.remove(&lease.key);
                debug!(key = %lease.key, "Lease released");
                true
            }
            _ => {
                warn!(key = %lease.key, "Lease was lost before release");
                false
            }
        }
    }
}
