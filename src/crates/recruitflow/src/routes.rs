//! Routing policy
//!
//! Each router is a pure function of the snapshot. The keys they return are
//! mapped to target nodes in [`crate::workflow::build_graph`]; a key missing
//! from that map is a programming defect the engine reports as
//! `InvalidTransition`.

use crate::state::{ApprovalStatus, GenerationStatus, StageStatus, WorkflowState};

pub const APPROVED: &str = "approved";
pub const REJECTED: &str = "rejected";
pub const PENDING: &str = "pending";
pub const REGENERATE: &str = "regenerate";
pub const THRESHOLD_MET: &str = "threshold-met";
pub const WAIT: &str = "wait";
pub const OPTIMIZE: &str = "optimize";
pub const PROCEED: &str = "proceed";
pub const COMPLETED: &str = "completed";
pub const SKIP: &str = "skip";
pub const SCHEDULE: &str = "schedule";
pub const REJECT: &str = "reject";
pub const SCHEDULED: &str = "scheduled";

/// After the description approval interrupt
pub fn description_approval(state: &WorkflowState) -> &'static str {
    let description = &state.description;
    if description.approval_status == ApprovalStatus::Rejected || description.status == GenerationStatus::Pending {
        REGENERATE
    } else if description.approval_status == ApprovalStatus::Approved {
        APPROVED
    } else {
        PENDING
    }
}

/// After a monitoring round: advance, wait, or widen reach
pub fn applicant_threshold(state: &WorkflowState) -> &'static str {
    let applicants = &state.applicants;
    let limits = &state.limits;
    let count = applicants.candidates.len();

    if count > 0 && count >= limits.min_applicants {
        THRESHOLD_MET
    } else if applicants.monitoring_rounds < limits.rounds_before_optimize {
        WAIT
    } else if state.description.optimization_attempts < limits.max_optimizations {
        OPTIMIZE
    } else if count > 0 {
        PROCEED
    } else {
        WAIT
    }
}

pub fn shortlist_approval(state: &WorkflowState) -> &'static str {
    match state.applicants.shortlist_approval {
        ApprovalStatus::Approved => APPROVED,
        ApprovalStatus::Rejected => REJECTED,
        ApprovalStatus::Pending => PENDING,
    }
}

/// A pending status after the prescreening node ran is unmapped on purpose
pub fn prescreening_outcome(state: &WorkflowState) -> &'static str {
    match state.prescreening.status {
        StageStatus::Completed => COMPLETED,
        StageStatus::Skipped => SKIP,
        StageStatus::Pending => PENDING,
    }
}

pub fn recruiter_decision(state: &WorkflowState) -> &'static str {
    match state.interviews.decision {
        ApprovalStatus::Approved => SCHEDULE,
        ApprovalStatus::Rejected => REJECT,
        ApprovalStatus::Pending => PENDING,
    }
}

pub fn scheduling_outcome(state: &WorkflowState) -> &'static str {
    match state.interviews.status {
        StageStatus::Completed => SCHEDULED,
        StageStatus::Skipped => SKIP,
        StageStatus::Pending => PENDING,
    }
}
