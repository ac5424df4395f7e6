//! # recruitflow
//!
//! Resumable hiring pipelines, one workflow thread per job posting.
//!
//! A job moves through description generation, posting, applicant
//! monitoring, shortlisting, voice prescreening and interview scheduling.
//! Four steps wait on a human: description approval, incoming applicants,
//! shortlist approval and the recruiter's review. Every transition is
//! checkpointed, so a process restart loses nothing and any historic
//! snapshot can be re-run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recruitflow::{JobInput, RecruitConfig, RecruitmentService};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RecruitConfig::default();
//! let service = RecruitmentService::from_config(&config).await?;
//!
//! let input: JobInput = serde_json::from_value(serde_json::json!({
//!     "role_title": "Data Analyst",
//!     "department": "Finance",
//!     "company_name": "Acme",
//!     "key_requirements": ["SQL", "Excel"],
//!     "experience_years": 2
//! }))?;
//! let status = service.create_job_with_id("analyst-1", input).await?;
//! assert_eq!(status.current_node, "await-description-approval");
//!
//! service.approve_description("analyst-1").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`state`] - the per-job snapshot and the updates humans send
//! - [`nodes`] and [`routes`] - stage logic and routing decisions
//! - [`workflow`] - graph wiring on top of `workflow-core`
//! - [`capabilities`] - collaborator traits and local implementations
//! - [`service`] - job-level operations used by the CLI and [`api`]

pub mod api;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod node_ids;
pub mod nodes;
pub mod routes;
pub mod service;
pub mod state;
pub mod workflow;

pub use capabilities::{ApplicantInbox, Capabilities, CapabilityError};
pub use config::{load_config, ConfigLoader, RecruitConfig};
pub use error::{RecruitError, Result};
pub use service::{JobStatus, RecruitmentService};
pub use state::{ApprovalStatus, CandidateRef, JobInput, StateUpdate, WorkflowLimits, WorkflowState};
pub use workflow::build_graph;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
