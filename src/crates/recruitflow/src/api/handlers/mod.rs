//! API request handlers, grouped by resource

pub mod checkpoints;
pub mod health;
pub mod jobs;

pub use checkpoints::{get_checkpoint, list_checkpoints};
pub use health::health;
pub use jobs::{
    abandon_job, add_applicants, approve_description, approve_shortlist, create_job, get_job, job_status, nudge_job,
    recover_job, regenerate_description, reject_shortlist, record_review, rerun_job,
};
