use super::stage_failure;
use crate::capabilities::{ApplicantSource, CandidateRanker, JobRequirements};
use crate::node_ids;
use crate::state::{ApprovalStatus, WorkflowState};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};
use workflow_core::{Node, Result, StageError, StageKind};

/// Pulls the applicants received so far into the snapshot
pub struct MonitorApplications {
    source: Arc<dyn ApplicantSource>,
}

impl MonitorApplications {
    pub fn new(source: Arc<dyn ApplicantSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Node<WorkflowState> for MonitorApplications {
    async fn execute(&self, state: &WorkflowState) -> Result<WorkflowState> {
        let incoming = self
            .source
            .fetch(&state.job_id)
            .await
            .map_err(|e| stage_failure(StageKind::Monitoring, node_ids::MONITOR_APPLICATIONS, e))?;

        let mut added = 0;
        let next = state.update(|s| {
            added = s.applicants.merge(&incoming);
            s.applicants.monitoring_rounds += 1;
        })?;

        info!(
            job_id = %state.job_id,
            round = next.applicants.monitoring_rounds,
            new = added,
            total = next.applicants.candidates.len(),
            "Applications checked"
        );
        Ok(next)
    }
}

/// Ranks applicants and proposes a shortlist for approval
pub struct ShortlistCandidates {
    ranker: Arc<dyn CandidateRanker>,
}

impl ShortlistCandidates {
    pub fn new(ranker: Arc<dyn CandidateRanker>) -> Self {
        Self { ranker }
    }

    /// Digest over the description revision and every candidate's id and
    /// profile, independent of arrival order
    pub fn fingerprint(state: &WorkflowState) -> String {
        let mut candidates: Vec<_> = state.applicants.candidates.iter().collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        let mut hasher = Sha256::new();
        hasher.update(format!("revision:{}\n", state.description.revision));
        for candidate in candidates {
            hasher.update(candidate.id.as_bytes());
            hasher.update([0x1fu8]);
            hasher.update(candidate.profile.as_bytes());
            hasher.update([0x1eu8]);
        }
        hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[async_trait]
impl Node<WorkflowState> for ShortlistCandidates {
    async fn execute(&self, state: &WorkflowState) -> Result<WorkflowState> {
        let applicants = &state.applicants;
        if applicants.candidates.is_empty() {
            return Err(StageError::ranking("no candidates to rank").into());
        }
        if !state.description.has_body() {
            return Err(StageError::ranking("no description to rank against").into());
        }

        let fingerprint = Self::fingerprint(state);
        if applicants.shortlist_fingerprint.as_deref() == Some(fingerprint.as_str())
            && applicants.shortlist_approval != ApprovalStatus::Rejected
        {
            debug!(job_id = %state.job_id, "Shortlist inputs unchanged");
            return Ok(state.clone());
        }

        let input = &state.description.input;
        let requirements = JobRequirements {
            title: state.description.title.clone().unwrap_or_else(|| input.role_title.clone()),
            key_requirements: input.key_requirements.clone(),
            nice_to_have: input.nice_to_have.clone(),
            experience_years: input.experience_years,
        };
        let mut scored = self
            .ranker
            .rank(&requirements, &applicants.candidates)
            .await
            .map_err(|e| stage_failure(StageKind::Ranking, node_ids::SHORTLIST_CANDIDATES, e))?;

        for entry in &scored {
            if applicants.candidate(&entry.candidate_id).is_none() {
                return Err(StageError::ranking(format!("ranker returned unknown candidate {}", entry.candidate_id)).into());
            }
            if !(0.0..=1.0).contains(&entry.score) {
                return Err(StageError::ranking(format!(
                    "score {} for {} is outside [0, 1]",
                    entry.score, entry.candidate_id
                ))
                .into());
            }
        }

        let mut seen = BTreeSet::new();
        scored.retain(|entry| seen.insert(entry.candidate_id.clone()));
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });

        let limits = &state.limits;
        let shortlisted: Vec<String> = scored
            .iter()
            .filter(|entry| entry.score >= limits.shortlist_min_score)
            .take(limits.shortlist_size)
            .map(|entry| entry.candidate_id.clone())
            .collect();
        let scores: BTreeMap<&str, f64> = scored.iter().map(|e| (e.candidate_id.as_str(), e.score)).collect();

        let next = state.update(|s| {
            for candidate in &mut s.applicants.candidates {
                if let Some(score) = scores.get(candidate.id.as_str()) {
                    candidate.score = Some(*score);
                }
            }
            s.applicants.shortlisted_ids = shortlisted;
            s.applicants.shortlist_fingerprint = Some(fingerprint);
            s.applicants.shortlist_approval = ApprovalStatus::Pending;
        })?;

        info!(
            job_id = %state.job_id,
            ranked = scored.len(),
            shortlisted = next.applicants.shortlisted_ids.len(),
            "Shortlist proposed"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{ApplicantInbox, CapabilityResult, KeywordRanker, ScoredCandidate};
    use crate::state::{CandidateRef, DescriptionSection, GenerationStatus, JobInput, WorkflowLimits};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use workflow_core::WorkflowError;

    struct Fixed {
        scores: Vec<(&'static str, f64)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CandidateRanker for Fixed {
        async fn rank(
            &self,
            _requirements: &JobRequirements,
            _candidates: &[CandidateRef],
        ) -> CapabilityResult<Vec<ScoredCandidate>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self
                .scores
                .iter()
                .map(|(id, score)| ScoredCandidate {
                    candidate_id: id.to_string(),
                    score: *score,
                })
                .collect())
        }
    }

    fn fixed(scores: Vec<(&'static str, f64)>) -> Arc<Fixed> {
        Arc::new(Fixed {
            scores,
            calls: AtomicUsize::new(0),
        })
    }

    fn posted() -> WorkflowState {
        let input = JobInput {
            role_title: "Backend Engineer".to_string(),
            department: "Platform".to_string(),
            company_name: "Acme".to_string(),
            company_description: None,
            key_requirements: vec!["Rust".to_string()],
            nice_to_have: vec![],
            experience_years: 3,
            location: None,
            prescreening_questions: vec![],
        };
        let limits = WorkflowLimits {
            shortlist_size: 2,
            shortlist_min_score: 0.5,
            ..Default::default()
        };
        WorkflowState::new("be-1", input, limits)
            .unwrap()
            .update(|s| {
                s.description.title = Some("Backend Engineer".to_string());
                s.description.sections = vec![DescriptionSection {
                    heading: "The Role".to_string(),
                    body: "Services".to_string(),
                }];
                s.description.status = GenerationStatus::Completed;
                s.description.revision = 1;
            })
            .unwrap()
    }

    fn with_candidates(state: &WorkflowState, ids: &[&str]) -> WorkflowState {
        state
            .update(|s| {
                let incoming: Vec<_> = ids.iter().map(|id| CandidateRef::new(*id, *id, "Rust")).collect();
                s.applicants.merge(&incoming);
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_monitoring_merges_and_counts_rounds() {
        let inbox = ApplicantInbox::new();
        inbox
            .submit("be-1", &[CandidateRef::new("a", "A", ""), CandidateRef::new("b", "B", "")])
            .await;
        let node = MonitorApplications::new(Arc::new(inbox.clone()));

        let once = node.execute(&posted()).await.unwrap();
        let twice = node.execute(&once).await.unwrap();

        assert_eq!(once.applicants.candidates.len(), 2);
        assert_eq!(twice.applicants.candidates.len(), 2);
        assert_eq!(twice.applicants.monitoring_rounds, 2);
    }

    #[tokio::test]
    async fn test_shortlist_orders_by_score_then_id() {
        let ranker = fixed(vec![("c", 0.9), ("a", 0.6), ("b", 0.9), ("d", 0.2)]);
        let state = with_candidates(&posted(), &["a", "b", "c", "d"]);
        let out = ShortlistCandidates::new(ranker.clone()).execute(&state).await.unwrap();

        assert_eq!(out.applicants.shortlisted_ids, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(out.applicants.candidate("d").unwrap().score, Some(0.2));
        assert_eq!(out.applicants.shortlist_approval, ApprovalStatus::Pending);
        assert!(out.applicants.shortlist_fingerprint.is_some());
    }

    #[tokio::test]
    async fn test_shortlist_skipped_when_inputs_unchanged() {
        let ranker = fixed(vec![("a", 0.9)]);
        let node = ShortlistCandidates::new(ranker.clone());
        let once = node.execute(&with_candidates(&posted(), &["a"])).await.unwrap();
        let twice = node.execute(&once).await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(ranker.calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_shortlist_is_reranked() {
        let ranker = fixed(vec![("a", 0.9)]);
        let node = ShortlistCandidates::new(ranker.clone());
        let once = node.execute(&with_candidates(&posted(), &["a"])).await.unwrap();
        let rejected = once
            .update(|s| s.applicants.shortlist_approval = ApprovalStatus::Rejected)
            .unwrap();

        let again = node.execute(&rejected).await.unwrap();
        assert_eq!(again.applicants.shortlist_approval, ApprovalStatus::Pending);
        assert_eq!(ranker.calls.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn test_fingerprint_ignores_arrival_order() {
        let a = with_candidates(&posted(), &["x", "y"]);
        let b = with_candidates(&posted(), &["y", "x"]);
        assert_eq!(ShortlistCandidates::fingerprint(&a), ShortlistCandidates::fingerprint(&b));

        let c = with_candidates(&posted(), &["x", "y", "z"]);
        assert_ne!(ShortlistCandidates::fingerprint(&a), ShortlistCandidates::fingerprint(&c));
        assert_eq!(ShortlistCandidates::fingerprint(&a).len(), 64);
    }

    #[tokio::test]
    async fn test_no_candidates_is_ranking_error() {
        let err = ShortlistCandidates::new(Arc::new(KeywordRanker))
            .execute(&posted())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Stage(ref e) if e.kind == StageKind::Ranking));
    }

    #[tokio::test]
    async fn test_unknown_ranked_candidate_rejected() {
        let ranker = fixed(vec![("ghost", 0.9)]);
        let err = ShortlistCandidates::new(ranker)
            .execute(&with_candidates(&posted(), &["a"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown candidate ghost"));
    }
}
