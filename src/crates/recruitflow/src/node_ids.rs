//! Stable identifiers of the recruitment pipeline's nodes

pub const GENERATE_DESCRIPTION: &str = "generate-description";
pub const AWAIT_DESCRIPTION_APPROVAL: &str = "await-description-approval";
pub const POST_JOB: &str = "post-job";
pub const MONITOR_APPLICATIONS: &str = "monitor-applications";
pub const AWAIT_APPLICATIONS: &str = "await-applications";
pub const OPTIMIZE_DESCRIPTION: &str = "optimize-description";
pub const SHORTLIST_CANDIDATES: &str = "shortlist-candidates";
pub const AWAIT_SHORTLIST_APPROVAL: &str = "await-shortlist-approval";
pub const VOICE_PRESCREENING: &str = "voice-prescreening";
pub const REVIEW_RESPONSES: &str = "review-responses";
pub const SCHEDULE_INTERVIEW: &str = "schedule-interview";

pub const COMPLETED: &str = "completed";
pub const REJECTED: &str = "rejected";
pub const ABANDONED: &str = "abandoned";
pub const ERROR: &str = "error";

/// Human-in-the-loop pause points
pub const INTERRUPTS: [&str; 4] = [
    AWAIT_DESCRIPTION_APPROVAL,
    AWAIT_APPLICATIONS,
    AWAIT_SHORTLIST_APPROVAL,
    REVIEW_RESPONSES,
];

pub const TERMINALS: [&str; 4] = [COMPLETED, REJECTED, ABANDONED, ERROR];

pub const ALL: [&str; 15] = [
    GENERATE_DESCRIPTION,
    AWAIT_DESCRIPTION_APPROVAL,
    POST_JOB,
    MONITOR_APPLICATIONS,
    AWAIT_APPLICATIONS,
    OPTIMIZE_DESCRIPTION,
    SHORTLIST_CANDIDATES,
    AWAIT_SHORTLIST_APPROVAL,
    VOICE_PRESCREENING,
    REVIEW_RESPONSES,
    SCHEDULE_INTERVIEW,
    COMPLETED,
    REJECTED,
    ABANDONED,
    ERROR,
];

pub fn is_known(id: &str) -> bool {
    ALL.contains(&id)
}
