use super::prompts::render;
use super::stage_failure;
use crate::capabilities::{JobPoster, JobPosting};
use crate::node_ids;
use crate::state::{ApprovalStatus, PostingState, WorkflowState};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use workflow_core::{Node, Result, StageError, StageKind};

/// Publishes the approved description. Never retries; failures halt the
/// thread at the error node.
pub struct PostJob {
    poster: Arc<dyn JobPoster>,
}

impl PostJob {
    pub fn new(poster: Arc<dyn JobPoster>) -> Self {
        Self { poster }
    }
}

#[async_trait]
impl Node<WorkflowState> for PostJob {
    async fn execute(&self, state: &WorkflowState) -> Result<WorkflowState> {
        let description = &state.description;
        if state.posting.posted && state.posting.posted_revision == Some(description.revision) {
            debug!(job_id = %state.job_id, revision = description.revision, "Revision already posted");
            return Ok(state.clone());
        }
        if description.approval_status != ApprovalStatus::Approved {
            return Err(StageError::posting("description is not approved").into());
        }

        let posting = JobPosting {
            job_id: state.job_id.clone(),
            title: description.title.clone().unwrap_or_default(),
            body: render(description),
            revision: description.revision,
            location: description.input.location.clone(),
        };
        let reference = self
            .poster
            .post(&posting)
            .await
            .map_err(|e| stage_failure(StageKind::Posting, node_ids::POST_JOB, e))?;

        info!(job_id = %state.job_id, revision = posting.revision, reference = %reference, "Job posted");
        Ok(state.with_posting(PostingState {
            posted: true,
            reference: Some(reference),
            posted_revision: Some(posting.revision),
            posted_at: Some(Utc::now()),
        })?)
    }
}
