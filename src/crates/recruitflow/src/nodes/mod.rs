//! Recruitment stage handlers
//!
//! Every node is safe to execute again with the same input: work that is
//! already reflected in the snapshot is skipped and the input is returned
//! unchanged.

pub mod applicants;
pub mod description;
pub mod posting;
pub mod prompts;
pub mod screening;

pub use applicants::{MonitorApplications, ShortlistCandidates};
pub use description::{GenerateDescription, OptimizeDescription};
pub use posting::PostJob;
pub use screening::{ScheduleInterview, VoicePrescreening};

use crate::capabilities::CapabilityError;
use workflow_core::{StageError, StageKind, WorkflowError};

/// Map a collaborator failure onto the stage taxonomy
pub(crate) fn stage_failure(kind: StageKind, node: &str, error: CapabilityError) -> WorkflowError {
    match error {
        CapabilityError::Unsupported(capability) => WorkflowError::UnsupportedCapability {
            capability,
            node: node.to_string(),
        },
        other => StageError::new(kind, other.to_string()).into(),
    }
}
