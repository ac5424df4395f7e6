//! Shared fixtures for recruitflow integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use recruitflow::capabilities::{CapabilityError, CapabilityResult, JobPoster, JobPosting};
use recruitflow::config::StoreBackend;
use recruitflow::{ApplicantInbox, CandidateRef, Capabilities, JobInput, RecruitConfig, RecruitmentService};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use workflow_checkpoint::InMemoryCheckpointStore;
use workflow_core::RetryPolicy;

pub fn test_config() -> RecruitConfig {
    let mut config = RecruitConfig::default();
    config.database.backend = StoreBackend::Memory;
    config.retry = RetryPolicy::none();
    config
}

pub fn analyst_input() -> JobInput {
    JobInput {
        role_title: "Data Analyst".to_string(),
        department: "Finance".to_string(),
        company_name: "Acme".to_string(),
        company_description: Some("Acme builds ledgers.".to_string()),
        key_requirements: vec!["SQL".to_string(), "Excel".to_string()],
        nice_to_have: vec!["Python".to_string()],
        experience_years: 2,
        location: Some("Remote".to_string()),
        prescreening_questions: vec!["Describe a report you automated.".to_string()],
    }
}

/// `n` applicants that clear the default shortlist threshold
pub fn strong_candidates(n: usize) -> Vec<CandidateRef> {
    (0..n)
        .map(|i| {
            let mut candidate = CandidateRef::new(format!("c{}", i), format!("Candidate {}", i), "SQL, Excel");
            candidate.score = Some(0.9 - i as f64 * 0.01);
            candidate
        })
        .collect()
}

pub fn memory_service(config: &RecruitConfig) -> RecruitmentService {
    RecruitmentService::with_store(config, Arc::new(InMemoryCheckpointStore::new())).expect("service")
}

/// Job board that fails while `down` is set
#[derive(Default)]
pub struct SwitchableBoard {
    pub down: AtomicBool,
    pub posts: AtomicUsize,
}

#[async_trait]
impl JobPoster for SwitchableBoard {
    async fn post(&self, posting: &JobPosting) -> CapabilityResult<String> {
        if self.down.load(Ordering::SeqCst) {
            return Err(CapabilityError::unavailable("job-board", "503 from upstream"));
        }
        self.posts.fetch_add(1, Ordering::SeqCst);
        Ok(format!("board://{}/{}", posting.job_id, posting.revision))
    }
}

/// Service whose job board is `board`; everything else is local
pub fn service_with_board(config: &RecruitConfig, board: Arc<SwitchableBoard>) -> RecruitmentService {
    let inbox = ApplicantInbox::new();
    let mut capabilities = Capabilities::local(&config.capabilities, &config.retry, inbox.clone());
    capabilities.poster = board as Arc<dyn JobPoster>;
    RecruitmentService::with_capabilities(config, Arc::new(InMemoryCheckpointStore::new()), capabilities, inbox)
        .expect("service")
}
