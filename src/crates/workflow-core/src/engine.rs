//! Checkpointed execution loop
//!
//! [`WorkflowEngine`] drives one thread at a time through a
//! [`CompiledGraph`]:
//!
//! ```text
//! load/create ─► execute current node ─► route ─► set current node ─► save checkpoint
//!                    ▲                                                     │
//!                    └──────────── until interrupt or terminal ◄───────────┘
//! ```
//!
//! Every transition is persisted before the loop moves on, so the latest
//! checkpoint is always the durable truth. A crashed execution resumes by
//! re-entering the node recorded in that checkpoint.
//!
//! Failures never advance the thread: the engine writes an error checkpoint
//! (the last good snapshot moved to the graph's error node with the message
//! recorded) and returns. Validation and routing defects come back
//! unchanged, everything else is wrapped in a [`GraphExecutionError`].

use crate::error::{GraphExecutionError, Result, ValidationError, WorkflowError};
use crate::graph::CompiledGraph;
use crate::lock::{Lease, LockService};
use crate::state::GraphState;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use workflow_checkpoint::{Checkpoint, CheckpointError, CheckpointMetadata, CheckpointSource, CheckpointStore};

/// Engine tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for a single node execution
    #[serde(with = "duration_ms")]
    pub node_timeout: Duration,

    /// Lease TTL for one execution loop
    #[serde(with = "duration_ms")]
    pub lock_ttl: Duration,

    /// How long to wait for a busy thread. Zero fails fast.
    #[serde(with = "duration_ms")]
    pub lock_wait: Duration,

    /// Node executions allowed per call before the loop is considered stuck
    pub max_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_timeout: Duration::from_secs(120),
            lock_ttl: Duration::from_secs(300),
            lock_wait: Duration::ZERO,
            max_steps: 64,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Lifecycle of a thread as seen from its latest checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Initial snapshot persisted, loop not started
    Created,
    /// Sitting at a pass-through node (mid-run, or interrupted by a crash)
    Running,
    /// Parked at an interrupt node waiting for an update
    Interrupted,
    /// Reached a terminal node
    Completed,
    /// Halted at the error node
    Errored,
    /// Terminated out-of-band
    Abandoned,
}

impl ExecutionStatus {
    pub fn of<S: GraphState>(graph: &CompiledGraph<S>, state: &S, source: CheckpointSource) -> Self {
        let node = state.current_node();
        if node == graph.error_node() {
            Self::Errored
        } else if graph.is_abandoned(node) {
            Self::Abandoned
        } else if graph.is_terminal(node) {
            Self::Completed
        } else if graph.is_interrupt(node) {
            Self::Interrupted
        } else if source == CheckpointSource::Input {
            Self::Created
        } else {
            Self::Running
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Abandoned)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Interrupted => "interrupted",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// Result of an engine call that drove the loop
#[derive(Debug, Clone)]
pub struct RunOutcome<S> {
    pub state: S,
    pub status: ExecutionStatus,
    /// Sequence of the checkpoint `state` was persisted as
    pub sequence: u64,
    /// Nodes executed during this call, in order
    pub trace: Vec<String>,
}

/// Read-only projection of a thread's latest checkpoint
#[derive(Debug, Clone)]
pub struct ThreadStatus<S> {
    pub state: S,
    pub status: ExecutionStatus,
    pub sequence: u64,
    pub written_at: DateTime<Utc>,
}

/// Scheduler driving threads through a compiled graph
pub struct WorkflowEngine<S: GraphState> {
    graph: Arc<CompiledGraph<S>>,
    store: Arc<dyn CheckpointStore>,
    locks: Arc<dyn LockService>,
    config: EngineConfig,
}

impl<S: GraphState> Clone for WorkflowEngine<S> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
            config: self.config.clone(),
        }
    }
}

/// Where the loop picks up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// Stop immediately if parked at an interrupt
    Continue,
    /// Execute the interrupt node the thread is parked at
    Resume,
}

impl<S: GraphState> WorkflowEngine<S> {
    pub fn new(
        graph: Arc<CompiledGraph<S>>,
        store: Arc<dyn CheckpointStore>,
        locks: Arc<dyn LockService>,
        config: EngineConfig,
    ) -> Self {
        Self {
            graph,
            store,
            locks,
            config,
        }
    }

    pub fn graph(&self) -> &CompiledGraph<S> {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a thread from `initial`, or continue an existing one.
    ///
    /// A new thread gets `initial` persisted as its first checkpoint. If the
    /// thread already exists its latest checkpoint wins and `initial` is
    /// ignored, which makes creation idempotent and doubles as crash recovery.
    /// Threads already at a terminal node are refused with `Terminal`.
    /// Returns once the thread is parked at an interrupt or terminal node.
    pub async fn run_until_interrupt(&self, initial: S) -> Result<RunOutcome<S>> {
        if !self.graph.contains(initial.current_node()) {
            return Err(WorkflowError::UnknownNode(initial.current_node().to_string()));
        }

        let lease = self.acquire(initial.thread_id()).await?;
        let result = self.start_locked(&lease, initial).await;
        self.release(&lease).await;
        result
    }

    /// Re-enter the node recorded in the latest checkpoint
    pub async fn recover(&self, thread_id: &str) -> Result<RunOutcome<S>> {
        let lease = self.acquire(thread_id).await?;
        let result = self.continue_locked(&lease, thread_id).await;
        self.release(&lease).await;
        result
    }

    /// Apply an external update to a thread parked at an interrupt node and
    /// run it until the next interrupt or terminal node.
    ///
    /// The update is persisted as its own checkpoint before any node runs.
    /// A rejected update writes nothing.
    pub async fn resume_from_checkpoint(&self, thread_id: &str, update: &S::Update) -> Result<RunOutcome<S>> {
        let lease = self.acquire(thread_id).await?;
        let result = self.resume_locked(&lease, thread_id, None, update).await;
        self.release(&lease).await;
        result
    }

    /// Like [`resume_from_checkpoint`](Self::resume_from_checkpoint), but
    /// only when the thread is parked at `node`. A thread parked anywhere
    /// else gets `NotResumable` and nothing is written.
    pub async fn resume_at(&self, thread_id: &str, node: &str, update: &S::Update) -> Result<RunOutcome<S>> {
        let lease = self.acquire(thread_id).await?;
        let result = self.resume_locked(&lease, thread_id, Some(node), update).await;
        self.release(&lease).await;
        result
    }

    /// Operator recovery: append the snapshot at `sequence` as the new head
    /// and run from it.
    pub async fn rerun_from_checkpoint(&self, thread_id: &str, sequence: u64) -> Result<RunOutcome<S>> {
        let lease = self.acquire(thread_id).await?;
        let result = self.rerun_locked(&lease, thread_id, sequence).await;
        self.release(&lease).await;
        result
    }

    /// Terminate a thread by writing an abandoned checkpoint.
    /// Abandoning an already abandoned thread is a no-op.
    pub async fn abandon(&self, thread_id: &str, reason: &str) -> Result<RunOutcome<S>> {
        let abandoned = self
            .graph
            .abandoned_node()
            .ok_or_else(|| WorkflowError::Graph("No abandoned node configured".to_string()))?
            .to_string();

        let lease = self.acquire(thread_id).await?;
        let result = self.abandon_locked(&lease, thread_id, &abandoned, reason).await;
        self.release(&lease).await;
        result
    }

    /// Latest persisted state. Never takes the lock.
    pub async fn status(&self, thread_id: &str) -> Result<ThreadStatus<S>> {
        let checkpoint = self.latest_checkpoint(thread_id).await?;
        let state: S = checkpoint.decode()?;
        Ok(ThreadStatus {
            status: ExecutionStatus::of(&self.graph, &state, checkpoint.metadata.source),
            state,
            sequence: checkpoint.sequence,
            written_at: checkpoint.written_at,
        })
    }

    /// State as persisted at `sequence`
    pub async fn state_at(&self, thread_id: &str, sequence: u64) -> Result<S> {
        Ok(self.store.load_at(thread_id, sequence).await?.decode()?)
    }

    /// Checkpoints of the thread, newest first
    pub async fn history(&self, thread_id: &str, limit: Option<usize>) -> Result<Vec<Checkpoint>> {
        let mut stream = self.store.list(thread_id, limit).await?;
        let mut checkpoints = Vec::new();
        while let Some(checkpoint) = stream.next().await {
            checkpoints.push(checkpoint?);
        }
        if checkpoints.is_empty() {
            return Err(WorkflowError::NotFound(thread_id.to_string()));
        }
        Ok(checkpoints)
    }

    async fn start_locked(&self, lease: &Lease, initial: S) -> Result<RunOutcome<S>> {
        let thread_id = initial.thread_id().to_string();
        if self.store.latest_sequence(&thread_id).await?.is_some() {
            debug!(thread_id = %thread_id, "Thread exists, continuing from latest checkpoint");
            return self.continue_locked(lease, &thread_id).await;
        }

        let sequence = self
            .save(lease, &initial, CheckpointMetadata::new(CheckpointSource::Input))
            .await?;
        info!(thread_id = %thread_id, node = %initial.current_node(), "Thread created");
        self.drive(lease, initial, sequence, Entry::Continue).await
    }

    async fn resume_locked(
        &self,
        lease: &Lease,
        thread_id: &str,
        expected: Option<&str>,
        update: &S::Update,
    ) -> Result<RunOutcome<S>> {
        let (state, _) = self.load_latest(thread_id).await?;
        let node = state.current_node().to_string();
        self.ensure_open(thread_id, &node)?;
        if !self.graph.is_interrupt(&node) || expected.is_some_and(|expected| expected != node) {
            return Err(WorkflowError::NotResumable {
                thread_id: thread_id.to_string(),
                node,
            });
        }

        let updated = state.apply_update(update)?;
        if updated.current_node() != node || updated.thread_id() != thread_id {
            return Err(ValidationError::new("current_node", "updates may not move or re-key a thread").into());
        }

        let sequence = self
            .save(
                lease,
                &updated,
                CheckpointMetadata::new(CheckpointSource::Update).with_node(node.clone()),
            )
            .await?;
        info!(thread_id = %thread_id, node = %node, sequence, "Update applied");

        self.drive(lease, updated, sequence, Entry::Resume).await
    }

    async fn rerun_locked(&self, lease: &Lease, thread_id: &str, sequence: u64) -> Result<RunOutcome<S>> {
        let (latest, _) = self.load_latest(thread_id).await?;
        if self.graph.is_abandoned(latest.current_node()) {
            return Err(WorkflowError::Abandoned(thread_id.to_string()));
        }

        let historic: S = self.store.load_at(thread_id, sequence).await?.decode()?;
        let node = historic.current_node().to_string();
        if node == self.graph.error_node() || self.graph.is_abandoned(&node) {
            return Err(WorkflowError::NotResumable {
                thread_id: thread_id.to_string(),
                node,
            });
        }

        let restored = historic.with_current_node(&node)?;
        let head = self
            .save(
                lease,
                &restored,
                CheckpointMetadata::new(CheckpointSource::Rerun)
                    .with_node(node.clone())
                    .with_note(format!("from sequence {}", sequence)),
            )
            .await?;
        info!(thread_id = %thread_id, node = %node, from = sequence, sequence = head, "Re-running");

        self.drive(lease, restored, head, Entry::Continue).await
    }

    async fn abandon_locked(&self, lease: &Lease, thread_id: &str, abandoned: &str, reason: &str) -> Result<RunOutcome<S>> {
        let (state, sequence) = self.load_latest(thread_id).await?;
        let node = state.current_node().to_string();

        if node == abandoned {
            return Ok(RunOutcome {
                state,
                status: ExecutionStatus::Abandoned,
                sequence,
                trace: Vec::new(),
            });
        }
        if self.graph.is_terminal(&node) && node != self.graph.error_node() {
            return Err(WorkflowError::Terminal {
                thread_id: thread_id.to_string(),
                node,
            });
        }

        let next = state.with_current_node(abandoned)?;
        let sequence = self
            .save(
                lease,
                &next,
                CheckpointMetadata::new(CheckpointSource::Abandon)
                    .with_node(node.clone())
                    .with_note(reason),
            )
            .await?;
        warn!(thread_id = %thread_id, node = %node, reason = %reason, "Thread abandoned");

        Ok(RunOutcome {
            state: next,
            status: ExecutionStatus::Abandoned,
            sequence,
            trace: Vec::new(),
        })
    }

    async fn continue_locked(&self, lease: &Lease, thread_id: &str) -> Result<RunOutcome<S>> {
        let (state, sequence) = self.load_latest(thread_id).await?;
        self.ensure_open(thread_id, state.current_node())?;
        self.drive(lease, state, sequence, Entry::Continue).await
    }

    fn ensure_open(&self, thread_id: &str, node: &str) -> Result<()> {
        if self.graph.is_abandoned(node) {
            return Err(WorkflowError::Abandoned(thread_id.to_string()));
        }
        if self.graph.is_terminal(node) {
            return Err(WorkflowError::Terminal {
                thread_id: thread_id.to_string(),
                node: node.to_string(),
            });
        }
        Ok(())
    }

    async fn drive(&self, lease: &Lease, mut state: S, mut sequence: u64, entry: Entry) -> Result<RunOutcome<S>> {
        let thread_id = state.thread_id().to_string();
        let mut trace = Vec::new();
        let mut execute_interrupt = entry == Entry::Resume;

        loop {
            let node_id = state.current_node().to_string();

            if self.graph.is_terminal(&node_id) {
                info!(thread_id = %thread_id, node = %node_id, sequence, "Thread reached terminal node");
                break;
            }
            if self.graph.is_interrupt(&node_id) && !execute_interrupt {
                info!(thread_id = %thread_id, node = %node_id, sequence, "Thread interrupted");
                break;
            }
            execute_interrupt = false;

            if trace.len() >= self.config.max_steps {
                let cause = WorkflowError::StepLimit(self.config.max_steps);
                return Err(self.fail(lease, &state, sequence, &node_id, cause).await);
            }

            let node = match self.graph.node(&node_id) {
                Some(node) => node,
                None => {
                    let cause = WorkflowError::UnknownNode(node_id.clone());
                    return Err(self.fail(lease, &state, sequence, &node_id, cause).await);
                }
            };

            trace.push(node_id.clone());
            debug!(thread_id = %thread_id, node = %node_id, "Executing node");

            let output = match tokio::time::timeout(self.config.node_timeout, node.execute(&state)).await {
                Ok(Ok(output)) => output,
                Ok(Err(cause)) => return Err(self.fail(lease, &state, sequence, &node_id, cause).await),
                Err(_) => {
                    let cause = WorkflowError::Timeout {
                        node: node_id.clone(),
                        timeout_ms: self.config.node_timeout.as_millis() as u64,
                    };
                    return Err(self.fail(lease, &state, sequence, &node_id, cause).await);
                }
            };

            if output.thread_id() != thread_id {
                let cause = ValidationError::new("thread_id", format!("node {} re-keyed the thread", node_id)).into();
                return Err(self.fail(lease, &state, sequence, &node_id, cause).await);
            }

            let transition = match self.graph.next(&node_id, &output) {
                Ok(transition) => transition,
                Err(cause) => return Err(self.fail(lease, &state, sequence, &node_id, cause).await),
            };

            let next = match output.with_current_node(&transition.target) {
                Ok(next) => next,
                Err(cause) => return Err(self.fail(lease, &state, sequence, &node_id, cause.into()).await),
            };

            sequence = self
                .save(lease, &next, CheckpointMetadata::new(CheckpointSource::Loop).with_node(node_id.clone()))
                .await?;
            info!(
                thread_id = %thread_id,
                from = %node_id,
                to = %transition.target,
                route = transition.route_key.unwrap_or("direct"),
                sequence,
                "Transition persisted"
            );
            state = next;
        }

        Ok(RunOutcome {
            status: ExecutionStatus::of(&self.graph, &state, CheckpointSource::Loop),
            state,
            sequence,
            trace,
        })
    }

    /// Record a node failure as an error checkpoint and build the error to
    /// return. `state` is the last persisted snapshot.
    async fn fail(&self, lease: &Lease, state: &S, last_checkpoint: u64, node: &str, cause: WorkflowError) -> WorkflowError {
        let message = cause.to_string();
        error!(thread_id = %state.thread_id(), node = %node, error = %message, "Node failed");

        let error_checkpoint = match state.with_error(self.graph.error_node(), &message) {
            Ok(halted) => {
                let metadata = CheckpointMetadata::new(CheckpointSource::Error)
                    .with_node(node)
                    .with_note(message.clone());
                match self.save(lease, &halted, metadata).await {
                    Ok(sequence) => Some(sequence),
                    Err(save_error) => {
                        error!(thread_id = %state.thread_id(), error = %save_error, "Error checkpoint not written");
                        return save_error;
                    }
                }
            }
            Err(invalid) => {
                error!(thread_id = %state.thread_id(), error = %invalid, "Error state rejected");
                None
            }
        };

        if cause.is_defect() {
            return cause;
        }
        GraphExecutionError {
            node: node.to_string(),
            last_checkpoint,
            error_checkpoint,
            source: Box::new(cause),
        }
        .into()
    }

    async fn save(&self, lease: &Lease, state: &S, metadata: CheckpointMetadata) -> Result<u64> {
        if lease.is_expired() {
            return Err(WorkflowError::LockExpired {
                thread_id: lease.key.clone(),
            });
        }
        let value = serde_json::to_value(state)?;
        Ok(self.store.save(state.thread_id(), value, metadata).await?)
    }

    async fn latest_checkpoint(&self, thread_id: &str) -> Result<Checkpoint> {
        match self.store.load_latest(thread_id).await {
            Ok(checkpoint) => Ok(checkpoint),
            Err(CheckpointError::NotFound { .. }) => Err(WorkflowError::NotFound(thread_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_latest(&self, thread_id: &str) -> Result<(S, u64)> {
        let checkpoint = self.latest_checkpoint(thread_id).await?;
        Ok((checkpoint.decode()?, checkpoint.sequence))
    }

    async fn acquire(&self, thread_id: &str) -> Result<Lease> {
        let lease = if self.config.lock_wait.is_zero() {
            self.locks.acquire(thread_id, self.config.lock_ttl).await
        } else {
            self.locks
                .acquire_within(thread_id, self.config.lock_ttl, self.config.lock_wait)
                .await
        };
        if let Err(WorkflowError::LockContention { .. }) = &lease {
            warn!(thread_id = %thread_id, "Thread is busy");
        }
        lease
    }

    async fn release(&self, lease: &Lease) {
        if !self.locks.release(lease).await {
            warn!(thread_id = %lease.key, "Lease expired during execution");
        }
    }
}
