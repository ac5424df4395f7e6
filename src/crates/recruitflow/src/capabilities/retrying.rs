//! Backoff wrapper for collaborators

use super::{
    CandidateRanker, CapabilityError, CapabilityResult, JobPoster, JobPosting, JobRequirements, ScoredCandidate,
    TextGenerator,
};
use crate::state::CandidateRef;
use async_trait::async_trait;
use std::sync::Arc;
use workflow_core::retry::retry;
use workflow_core::RetryPolicy;

/// Retries transient [`CapabilityError`]s of the wrapped collaborator
pub struct Retrying<T: ?Sized> {
    inner: Arc<T>,
    policy: RetryPolicy,
}

impl<T: ?Sized> Retrying<T> {
    pub fn new(inner: Arc<T>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl TextGenerator for Retrying<dyn TextGenerator> {
    async fn generate(&self, prompt: &str) -> CapabilityResult<String> {
        retry(&self.policy, "text_generation", CapabilityError::is_transient, || {
            self.inner.generate(prompt)
        })
        .await
    }
}

#[async_trait]
impl CandidateRanker for Retrying<dyn CandidateRanker> {
    async fn rank(
        &self,
        requirements: &JobRequirements,
        candidates: &[CandidateRef],
    ) -> CapabilityResult<Vec<ScoredCandidate>> {
        retry(&self.policy, "candidate_ranking", CapabilityError::is_transient, || {
            self.inner.rank(requirements, candidates)
        })
        .await
    }
}

#[async_trait]
impl JobPoster for Retrying<dyn JobPoster> {
    async fn post(&self, posting: &JobPosting) -> CapabilityResult<String> {
        retry(&self.policy, "job_posting", CapabilityError::is_transient, || {
            self.inner.post(posting)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyBoard {
        calls: AtomicUsize,
        failures: usize,
        error: CapabilityError,
    }

    #[async_trait]
    impl JobPoster for FlakyBoard {
        async fn post(&self, posting: &JobPosting) -> CapabilityResult<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(format!("board/{}", posting.job_id))
            }
        }
    }

    fn posting() -> JobPosting {
        JobPosting {
            job_id: "j1".to_string(),
            title: "Analyst".to_string(),
            body: "# Analyst".to_string(),
            revision: 1,
            location: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let board = Arc::new(FlakyBoard {
            calls: AtomicUsize::new(0),
            failures: 2,
            error: CapabilityError::unavailable("board", "503"),
        });
        let poster = Retrying::new(board.clone() as Arc<dyn JobPoster>, RetryPolicy::new(3));

        assert_eq!(poster.post(&posting()).await.unwrap(), "board/j1");
        assert_eq!(board.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let board = Arc::new(FlakyBoard {
            calls: AtomicUsize::new(0),
            failures: 5,
            error: CapabilityError::Rejected("duplicate posting".to_string()),
        });
        let poster = Retrying::new(board.clone() as Arc<dyn JobPoster>, RetryPolicy::new(3));

        assert!(poster.post(&posting()).await.is_err());
        assert_eq!(board.calls.load(Ordering::SeqCst), 1);
    }
}
