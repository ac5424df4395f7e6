use super::stage_failure;
use crate::capabilities::{InterviewScheduler, PrescreenRequest, ScheduleRequest, VoicePrescreener};
use crate::node_ids;
use crate::state::{StageStatus, WorkflowState};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use workflow_core::{Node, Result, StageKind};

/// Automated voice calls with the shortlisted candidates
pub struct VoicePrescreening {
    prescreener: Arc<dyn VoicePrescreener>,
}

impl VoicePrescreening {
    pub fn new(prescreener: Arc<dyn VoicePrescreener>) -> Self {
        Self { prescreener }
    }
}

#[async_trait]
impl Node<WorkflowState> for VoicePrescreening {
    async fn execute(&self, state: &WorkflowState) -> Result<WorkflowState> {
        if state.prescreening.status != StageStatus::Pending {
            debug!(job_id = %state.job_id, status = ?state.prescreening.status, "Prescreening already settled");
            return Ok(state.clone());
        }
        if !self.prescreener.is_enabled() {
            info!(job_id = %state.job_id, "Voice prescreening disabled, skipping");
            return Ok(state.update(|s| s.prescreening.status = StageStatus::Skipped)?);
        }

        let request = PrescreenRequest {
            job_id: state.job_id.clone(),
            candidates: state.applicants.shortlisted().into_iter().cloned().collect(),
            questions: state.prescreening.questions.clone(),
        };
        let scores = self
            .prescreener
            .prescreen(&request)
            .await
            .map_err(|e| stage_failure(StageKind::Prescreening, node_ids::VOICE_PRESCREENING, e))?;

        info!(job_id = %state.job_id, screened = scores.len(), "Prescreening completed");
        Ok(state.update(|s| {
            s.prescreening.scores = scores;
            s.prescreening.status = StageStatus::Completed;
        })?)
    }
}

/// Books interviews for the shortlisted candidates
pub struct ScheduleInterview {
    scheduler: Arc<dyn InterviewScheduler>,
}

impl ScheduleInterview {
    pub fn new(scheduler: Arc<dyn InterviewScheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl Node<WorkflowState> for ScheduleInterview {
    async fn execute(&self, state: &WorkflowState) -> Result<WorkflowState> {
        if state.interviews.status != StageStatus::Pending {
            debug!(job_id = %state.job_id, status = ?state.interviews.status, "Scheduling already settled");
            return Ok(state.clone());
        }
        if !self.scheduler.is_enabled() {
            info!(job_id = %state.job_id, "Interview scheduling disabled, skipping");
            return Ok(state.update(|s| s.interviews.status = StageStatus::Skipped)?);
        }

        let request = ScheduleRequest {
            job_id: state.job_id.clone(),
            candidate_ids: state.applicants.shortlisted_ids.clone(),
            not_before: state.updated_at,
        };
        let slots = self
            .scheduler
            .schedule(&request)
            .await
            .map_err(|e| stage_failure(StageKind::Scheduling, node_ids::SCHEDULE_INTERVIEW, e))?;

        info!(job_id = %state.job_id, scheduled = slots.len(), "Interviews scheduled");
        Ok(state.update(|s| {
            s.interviews.scheduled_count = slots.len() as u32;
            s.interviews.slots = slots;
            s.interviews.status = StageStatus::Completed;
        })?)
    }
}
