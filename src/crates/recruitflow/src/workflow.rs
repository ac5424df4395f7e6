//! Recruitment graph wiring
//!
//! ```text
//! generate-description ─► await-description-approval ─approved─► post-job ─► monitor-applications
//!          ▲                        │ regenerate                     ▲               │
//!          └────────────────────────┘                                │   wait ─► await-applications
//!                                              optimize-description ◄┘ optimize      │
//!                                                                  threshold-met / proceed
//!                                                                                    ▼
//!   completed ◄─ schedule-interview ◄─schedule─ review-responses ◄─ voice-prescreening ◄─approved─ await-shortlist-approval ◄─ shortlist-candidates
//! ```

use crate::capabilities::Capabilities;
use crate::node_ids::*;
use crate::nodes::{
    GenerateDescription, MonitorApplications, OptimizeDescription, PostJob, ScheduleInterview, ShortlistCandidates,
    VoicePrescreening,
};
use crate::routes;
use crate::state::WorkflowState;
use workflow_core::{CompiledGraph, GraphBuilder, Interrupt, Result};

/// Build and validate the recruitment graph over `capabilities`
pub fn build_graph(capabilities: &Capabilities) -> Result<CompiledGraph<WorkflowState>> {
    GraphBuilder::new()
        .add_node(GENERATE_DESCRIPTION, GenerateDescription::new(capabilities.text.clone()))
        .add_node(AWAIT_DESCRIPTION_APPROVAL, Interrupt::new())
        .add_node(POST_JOB, PostJob::new(capabilities.poster.clone()))
        .add_node(MONITOR_APPLICATIONS, MonitorApplications::new(capabilities.applicants.clone()))
        .add_node(AWAIT_APPLICATIONS, Interrupt::new())
        .add_node(OPTIMIZE_DESCRIPTION, OptimizeDescription::new(capabilities.text.clone()))
        .add_node(SHORTLIST_CANDIDATES, ShortlistCandidates::new(capabilities.ranker.clone()))
        .add_node(AWAIT_SHORTLIST_APPROVAL, Interrupt::new())
        .add_node(VOICE_PRESCREENING, VoicePrescreening::new(capabilities.prescreener.clone()))
        .add_node(REVIEW_RESPONSES, Interrupt::new())
        .add_node(SCHEDULE_INTERVIEW, ScheduleInterview::new(capabilities.scheduler.clone()))
        .add_terminal(COMPLETED)
        .add_terminal(REJECTED)
        .add_terminal(ABANDONED)
        .add_terminal(ERROR)
        .set_entry(GENERATE_DESCRIPTION)
        .set_error_node(ERROR)
        .set_abandoned_node(ABANDONED)
        .add_edge(GENERATE_DESCRIPTION, AWAIT_DESCRIPTION_APPROVAL)
        .add_conditional_edge(
            AWAIT_DESCRIPTION_APPROVAL,
            routes::description_approval,
            [
                (routes::APPROVED, POST_JOB),
                (routes::REGENERATE, GENERATE_DESCRIPTION),
                (routes::PENDING, AWAIT_DESCRIPTION_APPROVAL),
            ],
        )
        .add_edge(POST_JOB, MONITOR_APPLICATIONS)
        .add_conditional_edge(
            MONITOR_APPLICATIONS,
            routes::applicant_threshold,
            [
                (routes::THRESHOLD_MET, SHORTLIST_CANDIDATES),
                (routes::WAIT, AWAIT_APPLICATIONS),
                (routes::OPTIMIZE, OPTIMIZE_DESCRIPTION),
                (routes::PROCEED, SHORTLIST_CANDIDATES),
            ],
        )
        .add_edge(AWAIT_APPLICATIONS, MONITOR_APPLICATIONS)
        .add_edge(OPTIMIZE_DESCRIPTION, POST_JOB)
        .add_edge(SHORTLIST_CANDIDATES, AWAIT_SHORTLIST_APPROVAL)
        .add_conditional_edge(
            AWAIT_SHORTLIST_APPROVAL,
            routes::shortlist_approval,
            [
                (routes::APPROVED, VOICE_PRESCREENING),
                (routes::REJECTED, AWAIT_APPLICATIONS),
                (routes::PENDING, AWAIT_SHORTLIST_APPROVAL),
            ],
        )
        .add_conditional_edge(
            VOICE_PRESCREENING,
            routes::prescreening_outcome,
            [(routes::COMPLETED, REVIEW_RESPONSES), (routes::SKIP, REVIEW_RESPONSES)],
        )
        .add_conditional_edge(
            REVIEW_RESPONSES,
            routes::recruiter_decision,
            [
                (routes::SCHEDULE, SCHEDULE_INTERVIEW),
                (routes::REJECT, REJECTED),
                (routes::PENDING, REVIEW_RESPONSES),
            ],
        )
        .add_conditional_edge(
            SCHEDULE_INTERVIEW,
            routes::scheduling_outcome,
            [(routes::SCHEDULED, COMPLETED), (routes::SKIP, COMPLETED)],
        )
        .compile()
}
