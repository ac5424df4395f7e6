//! Deterministic local collaborators
//!
//! Stand-ins for the language model, job board, applicant tracking,
//! telephony and calendar services. Outputs depend only on their inputs, so
//! re-executing a node reproduces the same snapshot.

use super::{
    ApplicantSource, CandidateRanker, CapabilityError, CapabilityResult, InterviewScheduler, JobPoster, JobPosting,
    JobRequirements, PrescreenRequest, ScheduleRequest, ScoredCandidate, TextGenerator, VoicePrescreener,
};
use crate::state::{CandidateRef, InterviewSlot};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Line separating prompt fields from the text being revised
pub const PROMPT_BODY_MARKER: &str = "---";

const WHY_APPLY: &str = "## Why Apply";

/// Renders job descriptions from the `Key: value` fields of a prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateTextGenerator;

impl TemplateTextGenerator {
    fn fields(prompt: &str) -> (BTreeMap<String, String>, Option<String>) {
        let mut fields = BTreeMap::new();
        let mut lines = prompt.lines();
        while let Some(line) = lines.next() {
            if line.trim() == PROMPT_BODY_MARKER {
                let body: Vec<&str> = lines.collect();
                return (fields, Some(body.join("\n")));
            }
            if let Some((key, value)) = line.split_once(':') {
                fields.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }
        (fields, None)
    }

    fn bullets(list: &str) -> String {
        list.split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn write(fields: &BTreeMap<String, String>) -> CapabilityResult<String> {
        let field = |key: &str| fields.get(key).map(String::as_str).filter(|v| !v.is_empty());
        let role = field("role").ok_or_else(|| CapabilityError::Rejected("prompt has no role".to_string()))?;
        let company = field("company").unwrap_or("Our company");
        let department = field("department").unwrap_or("our");

        let mut out = format!("# {}\n\n", role);

        out.push_str(&format!("## About {}\n", company));
        match field("about") {
            Some(about) => out.push_str(about),
            None => out.push_str(&format!("{} is hiring in {}.", company, department)),
        }
        out.push_str("\n\n");

        out.push_str("## The Role\n");
        out.push_str(&format!("Join the {} team as a {}.", department, role));
        if let Some(location) = field("location") {
            out.push_str(&format!(" Location: {}.", location));
        }
        out.push_str("\n\n");

        let mut requirements = field("requirements").map(Self::bullets).unwrap_or_default();
        if let Some(years) = field("experience").and_then(|y| y.parse::<u32>().ok()).filter(|y| *y > 0) {
            if !requirements.is_empty() {
                requirements.push('\n');
            }
            requirements.push_str(&format!("- {}+ years of relevant experience", years));
        }
        if !requirements.is_empty() {
            out.push_str(&format!("## Requirements\n{}\n\n", requirements));
        }

        if let Some(nice) = field("nice to have") {
            out.push_str(&format!("## Nice to Have\n{}\n\n", Self::bullets(nice)));
        }

        if let Some(feedback) = field("feedback") {
            out.push_str(&format!("## Revision Notes\n{}\n\n", feedback));
        }

        Ok(out.trim_end().to_string())
    }

    fn optimize(fields: &BTreeMap<String, String>, current: &str) -> CapabilityResult<String> {
        if current.trim().is_empty() {
            return Err(CapabilityError::Rejected("nothing to optimize".to_string()));
        }
        let focus = fields
            .get("focus")
            .filter(|f| !f.is_empty())
            .cloned()
            .unwrap_or_else(|| "Flexible hours and a supportive team.".to_string());

        let kept: Vec<&str> = match current.find(WHY_APPLY) {
            Some(at) => current[..at].lines().collect(),
            None => current.lines().collect(),
        };
        Ok(format!("{}\n\n{}\n{}", kept.join("\n").trim_end(), WHY_APPLY, focus))
    }
}

#[async_trait]
impl TextGenerator for TemplateTextGenerator {
    async fn generate(&self, prompt: &str) -> CapabilityResult<String> {
        let (fields, body) = Self::fields(prompt);
        match fields.get("task").map(String::as_str) {
            Some("write") => Self::write(&fields),
            Some("optimize") => Self::optimize(&fields, body.as_deref().unwrap_or_default()),
            other => Err(CapabilityError::Rejected(format!("unknown task {:?}", other))),
        }
    }
}

/// Scores candidates by how many requirement phrases appear in their profile.
/// Nice-to-haves weigh half. A score supplied with the application wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordRanker;

impl KeywordRanker {
    fn score(requirements: &JobRequirements, profile: &str) -> f64 {
        let profile = profile.to_lowercase();
        let hits = |terms: &[String]| {
            terms
                .iter()
                .filter(|t| !t.trim().is_empty() && profile.contains(&t.trim().to_lowercase()))
                .count() as f64
        };

        let weight = requirements.key_requirements.len() as f64 + 0.5 * requirements.nice_to_have.len() as f64;
        if weight == 0.0 {
            return 0.0;
        }
        let matched = hits(&requirements.key_requirements) + 0.5 * hits(&requirements.nice_to_have);
        ((matched / weight) * 1000.0).round() / 1000.0
    }
}

#[async_trait]
impl CandidateRanker for KeywordRanker {
    async fn rank(
        &self,
        requirements: &JobRequirements,
        candidates: &[CandidateRef],
    ) -> CapabilityResult<Vec<ScoredCandidate>> {
        Ok(candidates
            .iter()
            .map(|candidate| ScoredCandidate {
                candidate_id: candidate.id.clone(),
                score: candidate
                    .score
                    .unwrap_or_else(|| Self::score(requirements, &candidate.profile)),
            })
            .collect())
    }
}

/// Publishes to the company careers page
#[derive(Debug, Clone)]
pub struct CareersPagePoster {
    base_url: String,
}

impl CareersPagePoster {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl JobPoster for CareersPagePoster {
    async fn post(&self, posting: &JobPosting) -> CapabilityResult<String> {
        if posting.title.trim().is_empty() || posting.body.trim().is_empty() {
            return Err(CapabilityError::Rejected("posting has no content".to_string()));
        }
        let reference = format!("{}/{}", self.base_url.trim_end_matches('/'), posting.job_id);
        debug!(job_id = %posting.job_id, revision = posting.revision, reference = %reference, "Posted job");
        Ok(reference)
    }
}

/// In-process applicant queue, fed by the API and read by monitoring
#[derive(Debug, Clone, Default)]
pub struct ApplicantInbox {
    applicants: Arc<RwLock<HashMap<String, Vec<CandidateRef>>>>,
}

impl ApplicantInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record applicants for a job; returns how many were new
    pub async fn submit(&self, job_id: &str, candidates: &[CandidateRef]) -> usize {
        let mut applicants = self.applicants.write().await;
        let received = applicants.entry(job_id.to_string()).or_default();
        let mut added = 0;
        for candidate in candidates {
            if !received.iter().any(|c| c.id == candidate.id) {
                received.push(candidate.clone());
                added += 1;
            }
        }
        added
    }

    pub async fn count(&self, job_id: &str) -> usize {
        self.applicants.read().await.get(job_id).map_or(0, Vec::len)
    }
}

#[async_trait]
impl ApplicantSource for ApplicantInbox {
    async fn fetch(&self, job_id: &str) -> CapabilityResult<Vec<CandidateRef>> {
        Ok(self.applicants.read().await.get(job_id).cloned().unwrap_or_default())
    }
}

/// Voice prescreening turned off by configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPrescreener;

#[async_trait]
impl VoicePrescreener for DisabledPrescreener {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn prescreen(&self, _request: &PrescreenRequest) -> CapabilityResult<BTreeMap<String, f64>> {
        Err(CapabilityError::Unsupported("voice prescreening".to_string()))
    }
}

/// Scores each call from the candidate's ranking and profile completeness
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedPrescreener;

#[async_trait]
impl VoicePrescreener for SimulatedPrescreener {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn prescreen(&self, request: &PrescreenRequest) -> CapabilityResult<BTreeMap<String, f64>> {
        Ok(request
            .candidates
            .iter()
            .map(|candidate| {
                let ranking = candidate.score.unwrap_or(0.5);
                let answered = if candidate.profile.trim().is_empty() { 0.0 } else { 1.0 };
                let score = ((0.8 * ranking + 0.2 * answered) * 1000.0).round() / 1000.0;
                (candidate.id.clone(), score.clamp(0.0, 1.0))
            })
            .collect())
    }
}

/// Interview scheduling turned off by configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledScheduler;

#[async_trait]
impl InterviewScheduler for DisabledScheduler {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn schedule(&self, _request: &ScheduleRequest) -> CapabilityResult<Vec<InterviewSlot>> {
        Err(CapabilityError::Unsupported("interview scheduling".to_string()))
    }
}

/// Books back-to-back hour slots starting one day after `not_before`
#[derive(Debug, Clone, Default)]
pub struct CalendarScheduler {
    meeting_base_url: Option<String>,
}

impl CalendarScheduler {
    pub fn new(meeting_base_url: Option<String>) -> Self {
        Self { meeting_base_url }
    }
}

#[async_trait]
impl InterviewScheduler for CalendarScheduler {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn schedule(&self, request: &ScheduleRequest) -> CapabilityResult<Vec<InterviewSlot>> {
        let first = request.not_before + Duration::days(1);
        Ok(request
            .candidate_ids
            .iter()
            .enumerate()
            .map(|(i, candidate_id)| InterviewSlot {
                candidate_id: candidate_id.clone(),
                starts_at: first + Duration::hours(i as i64),
                duration_minutes: 60,
                meeting_link: self
                    .meeting_base_url
                    .as_ref()
                    .map(|base| format!("{}/{}-{}", base.trim_end_matches('/'), request.job_id, candidate_id)),
            })
            .collect())
    }
}
