//! Recruitment workflow state
//!
//! [`WorkflowState`] is the single snapshot a job's thread carries through
//! the graph. Every change goes through [`WorkflowState::update`], which
//! copies the snapshot, refreshes `updated_at` and validates the result, so
//! the receiver is never modified and an invalid snapshot never escapes.

use crate::node_ids;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use workflow_core::{GraphState, ValidationError};

/// Most prescreening questions a job may carry
pub const MAX_PRESCREENING_QUESTIONS: usize = 10;

type Validation = std::result::Result<(), ValidationError>;

/// Human approval of a generated artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    #[default]
    Pending,
    Completed,
}

/// Outcome of an optional stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Pending,
    Completed,
    Skipped,
}

/// What the hiring manager asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    pub role_title: String,
    pub department: String,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_description: Option<String>,
    #[serde(default)]
    pub key_requirements: Vec<String>,
    #[serde(default)]
    pub nice_to_have: Vec<String>,
    #[serde(default)]
    pub experience_years: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub prescreening_questions: Vec<String>,
}

impl JobInput {
    pub fn validate(&self) -> Validation {
        require_text("description.input.role_title", &self.role_title)?;
        require_text("description.input.department", &self.department)?;
        require_text("description.input.company_name", &self.company_name)?;
        if self.prescreening_questions.len() > MAX_PRESCREENING_QUESTIONS {
            return Err(ValidationError::new(
                "description.input.prescreening_questions",
                format!("at most {} questions allowed", MAX_PRESCREENING_QUESTIONS),
            ));
        }
        if self.prescreening_questions.iter().any(|q| q.trim().is_empty()) {
            return Err(ValidationError::new(
                "description.input.prescreening_questions",
                "questions must not be blank",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionSection {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionState {
    pub input: JobInput,
    pub title: Option<String>,
    pub sections: Vec<DescriptionSection>,
    pub status: GenerationStatus,
    pub approval_status: ApprovalStatus,
    pub feedback: Option<String>,
    /// Bumped by every generation or optimization
    pub revision: u32,
    pub generation_attempts: u32,
    pub optimization_attempts: u32,
}

impl DescriptionState {
    pub fn new(input: JobInput) -> Self {
        Self {
            input,
            title: None,
            sections: Vec::new(),
            status: GenerationStatus::Pending,
            approval_status: ApprovalStatus::Pending,
            feedback: None,
            revision: 0,
            generation_attempts: 0,
            optimization_attempts: 0,
        }
    }

    pub fn has_body(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty()) && !self.sections.is_empty()
    }

    fn validate(&self) -> Validation {
        self.input.validate()?;
        if self.status == GenerationStatus::Completed && !self.has_body() {
            return Err(ValidationError::new(
                "description.status",
                "a completed description needs a title and at least one section",
            ));
        }
        if self.approval_status == ApprovalStatus::Approved && !self.has_body() {
            return Err(ValidationError::new(
                "description.approval_status",
                "cannot approve a description that has not been generated",
            ));
        }
        if self.sections.iter().any(|s| s.heading.trim().is_empty()) {
            return Err(ValidationError::new("description.sections", "section headings must not be blank"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingState {
    pub posted: bool,
    pub reference: Option<String>,
    /// Description revision the live posting shows
    pub posted_revision: Option<u32>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl PostingState {
    fn validate(&self) -> Validation {
        let complete = self.reference.is_some() && self.posted_revision.is_some() && self.posted_at.is_some();
        if self.posted != complete {
            return Err(ValidationError::new(
                "posting",
                "posted requires a reference, revision and timestamp",
            ));
        }
        Ok(())
    }
}

/// An applicant as the pipeline sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub profile: String,
    /// Ranking score in `[0, 1]`, set by shortlisting or by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl CandidateRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            profile: profile.into(),
            score: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantState {
    pub candidates: Vec<CandidateRef>,
    pub monitoring_rounds: u32,
    pub shortlisted_ids: Vec<String>,
    /// Digest of the inputs the current shortlist was ranked from
    pub shortlist_fingerprint: Option<String>,
    pub shortlist_approval: ApprovalStatus,
}

impl ApplicantState {
    pub fn candidate(&self, id: &str) -> Option<&CandidateRef> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn shortlisted(&self) -> Vec<&CandidateRef> {
        self.shortlisted_ids.iter().filter_map(|id| self.candidate(id)).collect()
    }

    /// Append candidates whose id is not known yet. Returns how many were added.
    pub fn merge(&mut self, incoming: &[CandidateRef]) -> usize {
        let mut known: BTreeSet<String> = self.candidates.iter().map(|c| c.id.clone()).collect();
        let mut added = 0;
        for candidate in incoming {
            if known.insert(candidate.id.clone()) {
                self.candidates.push(candidate.clone());
                added += 1;
            }
        }
        added
    }

    fn validate(&self) -> Validation {
        let mut ids = BTreeSet::new();
        for candidate in &self.candidates {
            require_text("applicants.candidates.id", &candidate.id)?;
            if !ids.insert(candidate.id.as_str()) {
                return Err(ValidationError::new(
                    "applicants.candidates",
                    format!("duplicate candidate id {}", candidate.id),
                ));
            }
            if let Some(score) = candidate.score {
                check_score("applicants.candidates.score", &candidate.id, score)?;
            }
        }

        let mut shortlisted = BTreeSet::new();
        for id in &self.shortlisted_ids {
            if !ids.contains(id.as_str()) {
                return Err(ValidationError::new(
                    "applicants.shortlisted_ids",
                    format!("unknown candidate {}", id),
                ));
            }
            if !shortlisted.insert(id.as_str()) {
                return Err(ValidationError::new(
                    "applicants.shortlisted_ids",
                    format!("candidate {} shortlisted twice", id),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrescreeningState {
    pub status: StageStatus,
    pub questions: Vec<String>,
    /// Candidate id to prescreening score
    pub scores: BTreeMap<String, f64>,
}

impl PrescreeningState {
    fn validate(&self) -> Validation {
        if self.questions.len() > MAX_PRESCREENING_QUESTIONS {
            return Err(ValidationError::new(
                "prescreening.questions",
                format!("at most {} questions allowed", MAX_PRESCREENING_QUESTIONS),
            ));
        }
        for (id, score) in &self.scores {
            check_score("prescreening.scores", id, *score)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewSlot {
    pub candidate_id: String,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewState {
    pub status: StageStatus,
    /// Recruiter decision after reviewing prescreening responses
    pub decision: ApprovalStatus,
    pub scheduled_count: u32,
    pub slots: Vec<InterviewSlot>,
}

impl InterviewState {
    fn validate(&self) -> Validation {
        if self.scheduled_count as usize != self.slots.len() {
            return Err(ValidationError::new(
                "interviews.scheduled_count",
                format!("{} does not match {} slots", self.scheduled_count, self.slots.len()),
            ));
        }
        Ok(())
    }
}

/// Policy thresholds, captured at creation so routing stays a pure function
/// of the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowLimits {
    pub min_applicants: usize,
    /// Monitoring rounds below threshold before the description is optimized
    pub rounds_before_optimize: u32,
    pub max_optimizations: u32,
    pub max_generation_attempts: u32,
    pub shortlist_size: usize,
    pub shortlist_min_score: f64,
}

impl Default for WorkflowLimits {
    fn default() -> Self {
        Self {
            min_applicants: 5,
            rounds_before_optimize: 2,
            max_optimizations: 2,
            max_generation_attempts: 3,
            shortlist_size: 5,
            shortlist_min_score: 0.7,
        }
    }
}

impl WorkflowLimits {
    pub fn validate(&self) -> Validation {
        if self.min_applicants == 0 {
            return Err(ValidationError::new("limits.min_applicants", "must be at least 1"));
        }
        if self.shortlist_size == 0 {
            return Err(ValidationError::new("limits.shortlist_size", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.shortlist_min_score) {
            return Err(ValidationError::new("limits.shortlist_min_score", "must be within [0, 1]"));
        }
        if self.max_generation_attempts == 0 {
            return Err(ValidationError::new("limits.max_generation_attempts", "must be at least 1"));
        }
        Ok(())
    }
}

/// Snapshot of one job's recruitment workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub job_id: String,
    pub thread_id: String,
    pub current_node: String,
    pub error_message: Option<String>,
    pub description: DescriptionState,
    pub posting: PostingState,
    pub applicants: ApplicantState,
    pub prescreening: PrescreeningState,
    pub interviews: InterviewState,
    pub limits: WorkflowLimits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Initial snapshot, positioned at the pipeline entry
    pub fn new(
        job_id: impl Into<String>,
        input: JobInput,
        limits: WorkflowLimits,
    ) -> std::result::Result<Self, ValidationError> {
        let job_id = job_id.into();
        let now = Utc::now();
        let state = Self {
            thread_id: Self::thread_id_for(&job_id),
            job_id,
            current_node: node_ids::GENERATE_DESCRIPTION.to_string(),
            error_message: None,
            description: DescriptionState::new(input),
            posting: PostingState::default(),
            applicants: ApplicantState::default(),
            prescreening: PrescreeningState::default(),
            interviews: InterviewState::default(),
            limits,
            created_at: now,
            updated_at: now,
        };
        state.validate()?;
        Ok(state)
    }

    pub fn thread_id_for(job_id: &str) -> String {
        format!("job-{}", job_id)
    }

    /// Copy, mutate, refresh `updated_at` and validate
    pub fn update<F>(&self, mutate: F) -> std::result::Result<Self, ValidationError>
    where
        F: FnOnce(&mut Self),
    {
        let mut next = self.clone();
        mutate(&mut next);

        if next.job_id != self.job_id || next.thread_id != self.thread_id {
            return Err(ValidationError::new("job_id", "job and thread ids are immutable"));
        }
        if next.created_at != self.created_at {
            return Err(ValidationError::new("created_at", "creation time is immutable"));
        }

        let now = Utc::now();
        next.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };

        next.validate()?;
        Ok(next)
    }

    /// Copy with the fields present in `update` replaced
    pub fn apply(&self, update: &StateUpdate) -> std::result::Result<Self, ValidationError> {
        self.update(|s| {
            if let Some(description) = &update.description {
                if let Some(status) = description.status {
                    s.description.status = status;
                }
                if let Some(approval) = description.approval_status {
                    s.description.approval_status = approval;
                }
                if let Some(feedback) = &description.feedback {
                    s.description.feedback = Some(feedback.clone());
                }
            }
            if let Some(applicants) = &update.applicants {
                s.applicants.merge(&applicants.add_candidates);
                if let Some(approval) = applicants.shortlist_approval {
                    s.applicants.shortlist_approval = approval;
                }
            }
            if let Some(interviews) = &update.interviews {
                if let Some(decision) = interviews.decision {
                    s.interviews.decision = decision;
                }
            }
        })
    }

    pub fn with_description(&self, description: DescriptionState) -> std::result::Result<Self, ValidationError> {
        self.update(|s| s.description = description)
    }

    pub fn with_posting(&self, posting: PostingState) -> std::result::Result<Self, ValidationError> {
        self.update(|s| s.posting = posting)
    }

    pub fn with_applicants(&self, applicants: ApplicantState) -> std::result::Result<Self, ValidationError> {
        self.update(|s| s.applicants = applicants)
    }

    pub fn with_prescreening(&self, prescreening: PrescreeningState) -> std::result::Result<Self, ValidationError> {
        self.update(|s| s.prescreening = prescreening)
    }

    pub fn with_interviews(&self, interviews: InterviewState) -> std::result::Result<Self, ValidationError> {
        self.update(|s| s.interviews = interviews)
    }

    pub fn validate(&self) -> Validation {
        require_text("job_id", &self.job_id)?;
        if self.thread_id != Self::thread_id_for(&self.job_id) {
            return Err(ValidationError::new(
                "thread_id",
                format!("expected job-{}, got {}", self.job_id, self.thread_id),
            ));
        }
        if !node_ids::is_known(&self.current_node) {
            return Err(ValidationError::new(
                "current_node",
                format!("unknown node {}", self.current_node),
            ));
        }

        let at_error = self.current_node == node_ids::ERROR;
        match (&self.error_message, at_error) {
            (Some(_), false) => {
                return Err(ValidationError::new(
                    "error_message",
                    "only the error node carries an error message",
                ))
            }
            (None, true) => {
                return Err(ValidationError::new("error_message", "the error node requires a message"))
            }
            _ => {}
        }

        if self.updated_at < self.created_at {
            return Err(ValidationError::new("updated_at", "precedes created_at"));
        }

        self.limits.validate()?;
        self.description.validate()?;
        self.posting.validate()?;
        self.applicants.validate()?;
        self.prescreening.validate()?;
        self.interviews.validate()
    }
}

impl GraphState for WorkflowState {
    type Update = StateUpdate;

    fn thread_id(&self) -> &str {
        &self.thread_id
    }

    fn current_node(&self) -> &str {
        &self.current_node
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn with_current_node(&self, node: &str) -> std::result::Result<Self, ValidationError> {
        self.update(|s| {
            s.current_node = node.to_string();
            s.error_message = None;
        })
    }

    fn with_error(&self, error_node: &str, message: &str) -> std::result::Result<Self, ValidationError> {
        self.update(|s| {
            s.current_node = error_node.to_string();
            s.error_message = Some(message.to_string());
        })
    }

    fn apply_update(&self, update: &StateUpdate) -> std::result::Result<Self, ValidationError> {
        self.apply(update)
    }
}

/// Human decision delivered on resume. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<DescriptionUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicants: Option<ApplicantUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interviews: Option<InterviewUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DescriptionUpdate {
    pub approval_status: Option<ApprovalStatus>,
    pub status: Option<GenerationStatus>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplicantUpdate {
    pub add_candidates: Vec<CandidateRef>,
    pub shortlist_approval: Option<ApprovalStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterviewUpdate {
    pub decision: Option<ApprovalStatus>,
}

impl StateUpdate {
    pub fn approve_description() -> Self {
        Self {
            description: Some(DescriptionUpdate {
                approval_status: Some(ApprovalStatus::Approved),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Send the description back for another generation pass
    pub fn regenerate_description(feedback: impl Into<String>) -> Self {
        Self {
            description: Some(DescriptionUpdate {
                approval_status: Some(ApprovalStatus::Rejected),
                status: Some(GenerationStatus::Pending),
                feedback: Some(feedback.into()),
            }),
            ..Default::default()
        }
    }

    pub fn add_candidates(candidates: Vec<CandidateRef>) -> Self {
        Self {
            applicants: Some(ApplicantUpdate {
                add_candidates: candidates,
                shortlist_approval: None,
            }),
            ..Default::default()
        }
    }

    pub fn approve_shortlist() -> Self {
        Self::shortlist_decision(ApprovalStatus::Approved)
    }

    pub fn reject_shortlist() -> Self {
        Self::shortlist_decision(ApprovalStatus::Rejected)
    }

    fn shortlist_decision(decision: ApprovalStatus) -> Self {
        Self {
            applicants: Some(ApplicantUpdate {
                add_candidates: Vec::new(),
                shortlist_approval: Some(decision),
            }),
            ..Default::default()
        }
    }

    /// Recruiter verdict after reviewing prescreening responses
    pub fn review_decision(decision: ApprovalStatus) -> Self {
        Self {
            interviews: Some(InterviewUpdate {
                decision: Some(decision),
            }),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.applicants.is_none() && self.interviews.is_none()
    }
}

fn require_text(field: &str, value: &str) -> Validation {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be blank"));
    }
    Ok(())
}

fn check_score(field: &str, id: &str, score: f64) -> Validation {
    if !(0.0..=1.0).contains(&score) {
        return Err(ValidationError::new(
            field,
            format!("score {} for {} is outside [0, 1]", score, id),
        ));
    }
    Ok(())
}
