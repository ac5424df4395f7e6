//! # workflow-core - Checkpointed State-Machine Engine
//!
//! A small engine for long-running, human-gated workflows. A workflow is a
//! [`CompiledGraph`] of stage handlers ([`Node`]s) joined by direct or routed
//! edges; the [`WorkflowEngine`] drives one **thread** (one workflow
//! instance) through it, persisting a checkpoint for every transition.
//!
//! ## Building blocks
//!
//! - [`GraphState`] - immutable, validated snapshot with copy-with-update methods
//! - [`Node`] / [`Interrupt`] - stage handlers; interrupt nodes park the thread
//! - [`GraphBuilder`] / [`CompiledGraph`] - node registry and route maps, validated once
//! - [`WorkflowEngine`] - run, resume, re-run and abandon threads
//! - [`LockService`] / [`InMemoryLockService`] - one execution per thread via expiring leases
//! - [`RetryPolicy`] / [`retry`](retry::retry) - backoff for collaborator calls
//! - [`WorkflowError`] - error taxonomy shared by nodes and the engine
//!
//! ## Execution model
//!
//! ```text
//! run_until_interrupt(initial)        resume_from_checkpoint(thread, update)
//!          │                                       │
//!          ▼                                       ▼
//!   ┌─────────────┐  route   ┌─────────────┐  update  ┌───────────────┐
//!   │ pass-through│ ───────► │  interrupt  │ ◄─────── │ human decision│
//!   └─────────────┘          └─────────────┘          └───────────────┘
//!          │ failure                 │ route
//!          ▼                         ▼
//!      error node              ... terminal node
//! ```
//!
//! Calls return as soon as the thread sits at an interrupt or terminal node;
//! nothing blocks waiting for a human. A later call, possibly in another
//! process, picks the thread up from its latest checkpoint.

pub mod engine;
pub mod error;
pub mod graph;
pub mod lock;
pub mod node;
pub mod retry;
pub mod state;

pub use engine::{EngineConfig, ExecutionStatus, RunOutcome, ThreadStatus, WorkflowEngine};
pub use error::{GraphExecutionError, Result, StageError, StageKind, ValidationError, WorkflowError};
pub use graph::{CompiledGraph, Edge, GraphBuilder, NodeId, Transition};
pub use lock::{InMemoryLockService, Lease, LockService};
pub use node::{Interrupt, Node};
pub use retry::RetryPolicy;
pub use state::GraphState;
