use super::prompts::{description_prompt, optimization_prompt, parse_description};
use super::stage_failure;
use crate::capabilities::TextGenerator;
use crate::node_ids;
use crate::state::{ApprovalStatus, GenerationStatus, WorkflowState};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use workflow_core::{Node, Result, StageError, StageKind};

/// Drafts the job description from the hiring manager's input
pub struct GenerateDescription {
    text: Arc<dyn TextGenerator>,
}

impl GenerateDescription {
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }
}

#[async_trait]
impl Node<WorkflowState> for GenerateDescription {
    async fn execute(&self, state: &WorkflowState) -> Result<WorkflowState> {
        let description = &state.description;
        if description.status == GenerationStatus::Completed {
            debug!(job_id = %state.job_id, revision = description.revision, "Description already generated");
            return Ok(state.clone());
        }
        if description.generation_attempts >= state.limits.max_generation_attempts {
            return Err(StageError::generation(format!(
                "gave up after {} attempts",
                description.generation_attempts
            ))
            .into());
        }

        let prompt = description_prompt(&description.input, description.feedback.as_deref());
        let text = self
            .text
            .generate(&prompt)
            .await
            .map_err(|e| stage_failure(StageKind::Generation, node_ids::GENERATE_DESCRIPTION, e))?;
        let (title, sections) = parse_description(&text).map_err(StageError::generation)?;

        let next = state.update(|s| {
            let d = &mut s.description;
            d.title = Some(title);
            d.sections = sections;
            d.status = GenerationStatus::Completed;
            d.approval_status = ApprovalStatus::Pending;
            d.revision += 1;
            d.generation_attempts += 1;
            s.prescreening.questions = d.input.prescreening_questions.clone();
        })?;

        info!(
            job_id = %state.job_id,
            revision = next.description.revision,
            attempt = next.description.generation_attempts,
            "Description generated"
        );
        Ok(next)
    }
}

/// Rewrites a live description to attract more applicants
pub struct OptimizeDescription {
    text: Arc<dyn TextGenerator>,
}

impl OptimizeDescription {
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }
}

#[async_trait]
impl Node<WorkflowState> for OptimizeDescription {
    async fn execute(&self, state: &WorkflowState) -> Result<WorkflowState> {
        if !state.description.has_body() {
            return Err(StageError::generation("no description to optimize").into());
        }

        let text = self
            .text
            .generate(&optimization_prompt(state))
            .await
            .map_err(|e| stage_failure(StageKind::Generation, node_ids::OPTIMIZE_DESCRIPTION, e))?;
        let (title, sections) = parse_description(&text).map_err(StageError::generation)?;

        let next = state.update(|s| {
            s.description.title = Some(title);
            s.description.sections = sections;
            s.description.revision += 1;
            s.description.optimization_attempts += 1;
            s.applicants.monitoring_rounds = 0;
        })?;

        info!(
            job_id = %state.job_id,
            revision = next.description.revision,
            optimization = next.description.optimization_attempts,
            "Description optimized"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CapabilityError, CapabilityResult, TemplateTextGenerator};
    use crate::state::{JobInput, StateUpdate, WorkflowLimits};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use workflow_core::WorkflowError;

    struct Counting {
        calls: AtomicUsize,
        fail: Option<CapabilityError>,
    }

    impl Counting {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: None,
            })
        }

        fn failing(error: CapabilityError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: Some(error),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Counting {
        async fn generate(&self, prompt: &str) -> CapabilityResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail {
                Some(e) => Err(e.clone()),
                None => TemplateTextGenerator.generate(prompt).await,
            }
        }
    }

    fn state() -> WorkflowState {
        let input = JobInput {
            role_title: "Site Reliability Engineer".to_string(),
            department: "Infrastructure".to_string(),
            company_name: "Acme".to_string(),
            company_description: None,
            key_requirements: vec!["Linux".to_string()],
            nice_to_have: vec![],
            experience_years: 3,
            location: Some("Berlin".to_string()),
            prescreening_questions: vec!["On-call experience?".to_string()],
        };
        WorkflowState::new("sre-1", input, WorkflowLimits::default()).unwrap()
    }

    #[tokio::test]
    async fn test_generation_fills_description() {
        let text = Counting::ok();
        let node = GenerateDescription::new(text.clone());
        let out = node.execute(&state()).await.unwrap();

        assert_eq!(out.description.title.as_deref(), Some("Site Reliability Engineer"));
        assert_eq!(out.description.status, GenerationStatus::Completed);
        assert_eq!(out.description.approval_status, ApprovalStatus::Pending);
        assert_eq!(out.description.revision, 1);
        assert_eq!(out.prescreening.questions, vec!["On-call experience?".to_string()]);
        assert_eq!(text.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reentry_is_byte_identical() {
        let text = Counting::ok();
        let node = GenerateDescription::new(text.clone());
        let once = node.execute(&state()).await.unwrap();
        let twice = node.execute(&once).await.unwrap();

        assert_eq!(serde_json::to_string(&once).unwrap(), serde_json::to_string(&twice).unwrap());
        assert_eq!(text.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_regeneration_uses_feedback() {
        let node = GenerateDescription::new(Counting::ok());
        let first = node.execute(&state()).await.unwrap();
        let rejected = first
            .apply(&StateUpdate::regenerate_description("mention the on-call rota"))
            .unwrap();
        let second = node.execute(&rejected).await.unwrap();

        assert_eq!(second.description.revision, 2);
        assert_eq!(second.description.approval_status, ApprovalStatus::Pending);
        assert!(second
            .description
            .sections
            .iter()
            .any(|s| s.body.contains("mention the on-call rota")));
    }

    #[tokio::test]
    async fn test_generation_attempt_limit() {
        let exhausted = state().update(|s| s.description.generation_attempts = 3).unwrap();
        let err = GenerateDescription::new(Counting::ok())
            .execute(&exhausted)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Stage(ref e) if e.kind == StageKind::Generation));
    }

    #[tokio::test]
    async fn test_collaborator_failure_is_generation_error() {
        let node = GenerateDescription::new(Counting::failing(CapabilityError::unavailable("llm", "overloaded")));
        let err = node.execute(&state()).await.unwrap_err();
        assert_eq!(err.to_string(), "Description generation failed: llm unavailable: overloaded");
    }

    #[tokio::test]
    async fn test_optimization_bumps_revision_and_resets_rounds() {
        let generated = GenerateDescription::new(Counting::ok()).execute(&state()).await.unwrap();
        let waiting = generated
            .update(|s| {
                s.description.approval_status = ApprovalStatus::Approved;
                s.applicants.monitoring_rounds = 2;
            })
            .unwrap();

        let out = OptimizeDescription::new(Counting::ok()).execute(&waiting).await.unwrap();
        assert_eq!(out.description.revision, 2);
        assert_eq!(out.description.optimization_attempts, 1);
        assert_eq!(out.applicants.monitoring_rounds, 0);
        assert_eq!(out.description.approval_status, ApprovalStatus::Approved);
        assert_eq!(out.description.sections.last().unwrap().heading, "Why Apply");
    }

    #[tokio::test]
    async fn test_optimization_requires_description() {
        let err = OptimizeDescription::new(Counting::ok()).execute(&state()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Stage(_)));
    }
}
