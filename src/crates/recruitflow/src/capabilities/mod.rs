//! External collaborators
//!
//! Nodes talk to the outside world only through these traits. Local,
//! deterministic implementations live in [`local`]; [`Retrying`] adds
//! backoff for transient failures at this boundary.

pub mod local;
pub mod retrying;

pub use local::{
    ApplicantInbox, CalendarScheduler, CareersPagePoster, DisabledPrescreener, DisabledScheduler, KeywordRanker,
    SimulatedPrescreener, TemplateTextGenerator,
};
pub use retrying::Retrying;

use crate::config::CapabilitiesConfig;
use crate::state::{CandidateRef, InterviewSlot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use workflow_core::RetryPolicy;

pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("{service} rate limited, retry after {retry_after_ms}ms")]
    RateLimited { service: String, retry_after_ms: u64 },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Capability not supported: {0}")]
    Unsupported(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CapabilityError {
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether the same request may succeed later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::RateLimited { .. })
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> CapabilityResult<String>;
}

/// What candidates are ranked against
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequirements {
    pub title: String,
    pub key_requirements: Vec<String>,
    pub nice_to_have: Vec<String>,
    pub experience_years: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate_id: String,
    /// Fit in `[0, 1]`
    pub score: f64,
}

#[async_trait]
pub trait CandidateRanker: Send + Sync {
    async fn rank(
        &self,
        requirements: &JobRequirements,
        candidates: &[CandidateRef],
    ) -> CapabilityResult<Vec<ScoredCandidate>>;
}

/// Rendered posting handed to a job board
#[derive(Debug, Clone, PartialEq)]
pub struct JobPosting {
    pub job_id: String,
    pub title: String,
    pub body: String,
    pub revision: u32,
    pub location: Option<String>,
}

#[async_trait]
pub trait JobPoster: Send + Sync {
    /// Publish (or republish) a posting; returns the external reference
    async fn post(&self, posting: &JobPosting) -> CapabilityResult<String>;
}

#[async_trait]
pub trait ApplicantSource: Send + Sync {
    /// Every applicant received for the job so far. Reads do not consume.
    async fn fetch(&self, job_id: &str) -> CapabilityResult<Vec<CandidateRef>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrescreenRequest {
    pub job_id: String,
    pub candidates: Vec<CandidateRef>,
    pub questions: Vec<String>,
}

#[async_trait]
pub trait VoicePrescreener: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Candidate id to score in `[0, 1]`
    async fn prescreen(&self, request: &PrescreenRequest) -> CapabilityResult<BTreeMap<String, f64>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRequest {
    pub job_id: String,
    pub candidate_ids: Vec<String>,
    /// No slot may start before this instant
    pub not_before: DateTime<Utc>,
}

#[async_trait]
pub trait InterviewScheduler: Send + Sync {
    fn is_enabled(&self) -> bool;

    async fn schedule(&self, request: &ScheduleRequest) -> CapabilityResult<Vec<InterviewSlot>>;
}

/// Everything the recruitment nodes depend on
#[derive(Clone)]
pub struct Capabilities {
    pub text: Arc<dyn TextGenerator>,
    pub ranker: Arc<dyn CandidateRanker>,
    pub poster: Arc<dyn JobPoster>,
    pub applicants: Arc<dyn ApplicantSource>,
    pub prescreener: Arc<dyn VoicePrescreener>,
    pub scheduler: Arc<dyn InterviewScheduler>,
}

impl Capabilities {
    /// Local implementations wired per configuration, with retries on the
    /// generator, ranker and poster
    pub fn local(config: &CapabilitiesConfig, retry: &RetryPolicy, inbox: ApplicantInbox) -> Self {
        let text: Arc<dyn TextGenerator> = Arc::new(TemplateTextGenerator);
        let ranker: Arc<dyn CandidateRanker> = Arc::new(KeywordRanker);
        let poster: Arc<dyn JobPoster> = Arc::new(CareersPagePoster::new(config.careers_base_url.clone()));

        let prescreener: Arc<dyn VoicePrescreener> = if config.voice_prescreening {
            Arc::new(SimulatedPrescreener)
        } else {
            Arc::new(DisabledPrescreener)
        };
        let scheduler: Arc<dyn InterviewScheduler> = if config.interview_scheduling {
            Arc::new(CalendarScheduler::new(config.meeting_base_url.clone()))
        } else {
            Arc::new(DisabledScheduler)
        };

        Self {
            text: Arc::new(Retrying::new(text, retry.clone())),
            ranker: Arc::new(Retrying::new(ranker, retry.clone())),
            poster: Arc::new(Retrying::new(poster, retry.clone())),
            applicants: Arc::new(inbox),
            prescreener,
            scheduler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CapabilityError::unavailable("board", "503").is_transient());
        assert!(CapabilityError::RateLimited {
            service: "llm".to_string(),
            retry_after_ms: 100
        }
        .is_transient());
        assert!(!CapabilityError::Rejected("spam".to_string()).is_transient());
        assert!(!CapabilityError::Unsupported("voice".to_string()).is_transient());
    }

    #[test]
    fn test_local_bundle_respects_flags() {
        let mut config = CapabilitiesConfig::default();
        let caps = Capabilities::local(&config, &RetryPolicy::none(), ApplicantInbox::new());
        assert!(!caps.prescreener.is_enabled());
        assert!(!caps.scheduler.is_enabled());

        config.voice_prescreening = true;
        config.interview_scheduling = true;
        let caps = Capabilities::local(&config, &RetryPolicy::none(), ApplicantInbox::new());
        assert!(caps.prescreener.is_enabled());
        assert!(caps.scheduler.is_enabled());
    }
}
