//! Job-level facade over the workflow engine
//!
//! [`RecruitmentService`] is what the HTTP adapter and the CLI call. Every
//! operation maps onto one engine call; human decisions become
//! [`StateUpdate`]s delivered with `resume_at` to the one interrupt each
//! decision belongs to. A decision sent while the job waits elsewhere is
//! refused with `NOT_RESUMABLE` and changes nothing.

use crate::capabilities::{ApplicantInbox, Capabilities};
use crate::config::{RecruitConfig, StoreBackend};
use crate::error::{RecruitError, Result};
use crate::node_ids;
use crate::state::{ApprovalStatus, CandidateRef, JobInput, StateUpdate, WorkflowLimits, WorkflowState};
use crate::workflow::build_graph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use workflow_checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore};
use workflow_core::{ExecutionStatus, GraphState, InMemoryLockService, RunOutcome, ThreadStatus, WorkflowEngine};

/// Where a job stands, as of its latest checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub thread_id: String,
    pub current_node: String,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub sequence: u64,
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    fn from_state(state: &WorkflowState, status: ExecutionStatus, sequence: u64) -> Self {
        Self {
            job_id: state.job_id.clone(),
            thread_id: state.thread_id.clone(),
            current_node: state.current_node.clone(),
            status,
            error_message: state.error_message.clone(),
            sequence,
            updated_at: state.updated_at,
        }
    }
}

impl From<&RunOutcome<WorkflowState>> for JobStatus {
    fn from(outcome: &RunOutcome<WorkflowState>) -> Self {
        Self::from_state(&outcome.state, outcome.status, outcome.sequence)
    }
}

impl From<&ThreadStatus<WorkflowState>> for JobStatus {
    fn from(thread: &ThreadStatus<WorkflowState>) -> Self {
        Self::from_state(&thread.state, thread.status, thread.sequence)
    }
}

#[derive(Clone)]
pub struct RecruitmentService {
    engine: WorkflowEngine<WorkflowState>,
    inbox: ApplicantInbox,
    limits: WorkflowLimits,
}

impl RecruitmentService {
    /// Open the configured checkpoint store and wire local collaborators
    pub async fn from_config(config: &RecruitConfig) -> Result<Self> {
        let store: Arc<dyn CheckpointStore> = match config.database.backend {
            StoreBackend::Memory => Arc::new(InMemoryCheckpointStore::new()),
            StoreBackend::Sqlite => {
                let path = config.database_path();
                info!(path = %path.display(), "Opening checkpoint database");
                Arc::new(SqliteCheckpointStore::open(&path).await?)
            }
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: &RecruitConfig, store: Arc<dyn CheckpointStore>) -> Result<Self> {
        let inbox = ApplicantInbox::new();
        let capabilities = Capabilities::local(&config.capabilities, &config.retry, inbox.clone());
        Self::with_capabilities(config, store, capabilities, inbox)
    }

    /// Wire explicit collaborators. `inbox` receives applicants submitted
    /// through [`add_applicants`](Self::add_applicants).
    pub fn with_capabilities(
        config: &RecruitConfig,
        store: Arc<dyn CheckpointStore>,
        capabilities: Capabilities,
        inbox: ApplicantInbox,
    ) -> Result<Self> {
        config.workflow.validate()?;
        let graph = build_graph(&capabilities)?;
        let engine = WorkflowEngine::new(
            Arc::new(graph),
            store,
            Arc::new(InMemoryLockService::new()),
            config.engine.to_engine_config(),
        );
        Ok(Self {
            engine,
            inbox,
            limits: config.workflow.clone(),
        })
    }

    pub fn engine(&self) -> &WorkflowEngine<WorkflowState> {
        &self.engine
    }

    pub fn inbox(&self) -> &ApplicantInbox {
        &self.inbox
    }

    /// Start a workflow for a new job and run it to the first approval
    pub async fn create_job(&self, input: JobInput) -> Result<JobStatus> {
        self.create_job_with_id(&Uuid::new_v4().to_string(), input).await
    }

    /// Like [`create_job`](Self::create_job) with a caller-chosen id. Calling
    /// it again for an existing job continues that job instead.
    pub async fn create_job_with_id(&self, job_id: &str, input: JobInput) -> Result<JobStatus> {
        let initial = WorkflowState::new(job_id, input, self.limits.clone())?;
        let outcome = self.engine.run_until_interrupt(initial).await?;
        info!(job_id = %job_id, node = %outcome.state.current_node, "Job created");
        Ok(JobStatus::from(&outcome))
    }

    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let thread = self.engine.status(&WorkflowState::thread_id_for(job_id)).await?;
        Ok(JobStatus::from(&thread))
    }

    /// Full latest snapshot
    pub async fn job_state(&self, job_id: &str) -> Result<WorkflowState> {
        Ok(self.engine.status(&WorkflowState::thread_id_for(job_id)).await?.state)
    }

    pub async fn approve_description(&self, job_id: &str) -> Result<JobStatus> {
        self.decide(job_id, node_ids::AWAIT_DESCRIPTION_APPROVAL, &StateUpdate::approve_description())
            .await
    }

    pub async fn regenerate_description(&self, job_id: &str, feedback: &str) -> Result<JobStatus> {
        if feedback.trim().is_empty() {
            return Err(RecruitError::InvalidRequest("feedback must not be empty".to_string()));
        }
        self.decide(
            job_id,
            node_ids::AWAIT_DESCRIPTION_APPROVAL,
            &StateUpdate::regenerate_description(feedback),
        )
        .await
    }

    /// Record applicants. A job parked waiting for applicants is resumed
    /// with them; otherwise they are picked up by the next monitoring round.
    pub async fn add_applicants(&self, job_id: &str, candidates: Vec<CandidateRef>) -> Result<JobStatus> {
        if candidates.is_empty() {
            return Err(RecruitError::InvalidRequest("no applicants given".to_string()));
        }
        let thread = self.engine.status(&WorkflowState::thread_id_for(job_id)).await?;
        let added = self.inbox.submit(job_id, &candidates).await;
        info!(job_id = %job_id, submitted = candidates.len(), new = added, "Applicants received");

        if thread.state.current_node() == node_ids::AWAIT_APPLICATIONS {
            self.decide(job_id, node_ids::AWAIT_APPLICATIONS, &StateUpdate::add_candidates(candidates))
                .await
        } else {
            Ok(JobStatus::from(&thread))
        }
    }

    pub async fn approve_shortlist(&self, job_id: &str) -> Result<JobStatus> {
        self.decide(job_id, node_ids::AWAIT_SHORTLIST_APPROVAL, &StateUpdate::approve_shortlist())
            .await
    }

    pub async fn reject_shortlist(&self, job_id: &str) -> Result<JobStatus> {
        self.decide(job_id, node_ids::AWAIT_SHORTLIST_APPROVAL, &StateUpdate::reject_shortlist())
            .await
    }

    /// Recruiter verdict on prescreening: approve schedules interviews,
    /// reject closes the job
    pub async fn record_review(&self, job_id: &str, decision: ApprovalStatus) -> Result<JobStatus> {
        self.decide(job_id, node_ids::REVIEW_RESPONSES, &StateUpdate::review_decision(decision))
            .await
    }

    /// Wake a job parked at an interrupt without changing anything, e.g. to
    /// run another monitoring round
    pub async fn nudge(&self, job_id: &str) -> Result<JobStatus> {
        let outcome = self
            .engine
            .resume_from_checkpoint(&WorkflowState::thread_id_for(job_id), &StateUpdate::default())
            .await?;
        Ok(JobStatus::from(&outcome))
    }

    pub async fn abandon_job(&self, job_id: &str, reason: &str) -> Result<JobStatus> {
        let outcome = self
            .engine
            .abandon(&WorkflowState::thread_id_for(job_id), reason)
            .await?;
        Ok(JobStatus::from(&outcome))
    }

    /// Operator recovery from a known-good checkpoint
    pub async fn rerun_job(&self, job_id: &str, sequence: u64) -> Result<JobStatus> {
        let outcome = self
            .engine
            .rerun_from_checkpoint(&WorkflowState::thread_id_for(job_id), sequence)
            .await?;
        Ok(JobStatus::from(&outcome))
    }

    /// Re-enter the node the latest checkpoint points at
    pub async fn recover_job(&self, job_id: &str) -> Result<JobStatus> {
        let outcome = self.engine.recover(&WorkflowState::thread_id_for(job_id)).await?;
        Ok(JobStatus::from(&outcome))
    }

    /// Checkpoints newest first
    pub async fn history(&self, job_id: &str, limit: Option<usize>) -> Result<Vec<Checkpoint>> {
        Ok(self
            .engine
            .history(&WorkflowState::thread_id_for(job_id), limit)
            .await?)
    }

    pub async fn checkpoint(&self, job_id: &str, sequence: u64) -> Result<WorkflowState> {
        Ok(self
            .engine
            .state_at(&WorkflowState::thread_id_for(job_id), sequence)
            .await?)
    }

    /// Deliver `update` only if the job is parked at `node`
    async fn decide(&self, job_id: &str, node: &str, update: &StateUpdate) -> Result<JobStatus> {
        let outcome = self
            .engine
            .resume_at(&WorkflowState::thread_id_for(job_id), node, update)
            .await?;
        Ok(JobStatus::from(&outcome))
    }
}
