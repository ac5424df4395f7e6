//! End-to-end hiring runs through RecruitmentService

mod common;

use common::*;
use recruitflow::node_ids;
use recruitflow::state::{GenerationStatus, StageStatus};
use recruitflow::{ApprovalStatus, RecruitError};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use workflow_checkpoint::CheckpointSource;
use workflow_core::{ExecutionStatus, WorkflowError};

#[tokio::test]
async fn test_happy_path_reaches_completed() {
    let mut config = test_config();
    config.capabilities.voice_prescreening = true;
    config.capabilities.interview_scheduling = true;
    config.capabilities.meeting_base_url = Some("https://meet.example".to_string());
    let service = memory_service(&config);

    let status = service.create_job_with_id("analyst-1", analyst_input()).await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_DESCRIPTION_APPROVAL);
    assert_eq!(status.status, ExecutionStatus::Interrupted);
    assert_eq!(status.thread_id, "job-analyst-1");

    let state = service.job_state("analyst-1").await.unwrap();
    assert_eq!(state.description.status, GenerationStatus::Completed);
    assert_eq!(state.description.title.as_deref(), Some("Data Analyst"));
    assert_eq!(state.prescreening.questions, vec!["Describe a report you automated.".to_string()]);

    let status = service.approve_description("analyst-1").await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_APPLICATIONS);

    let state = service.job_state("analyst-1").await.unwrap();
    assert!(state.posting.posted);
    assert_eq!(state.posting.reference.as_deref(), Some("/careers/analyst-1"));
    assert_eq!(state.applicants.monitoring_rounds, 1);

    let status = service.add_applicants("analyst-1", strong_candidates(5)).await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_SHORTLIST_APPROVAL);

    let state = service.job_state("analyst-1").await.unwrap();
    assert_eq!(state.applicants.candidates.len(), 5);
    assert_eq!(state.applicants.shortlisted_ids, vec!["c0", "c1", "c2", "c3", "c4"]);

    let status = service.approve_shortlist("analyst-1").await.unwrap();
    assert_eq!(status.current_node, node_ids::REVIEW_RESPONSES);

    let state = service.job_state("analyst-1").await.unwrap();
    assert_eq!(state.prescreening.status, StageStatus::Completed);
    assert_eq!(state.prescreening.scores.len(), 5);

    let status = service.record_review("analyst-1", ApprovalStatus::Approved).await.unwrap();
    assert_eq!(status.current_node, node_ids::COMPLETED);
    assert_eq!(status.status, ExecutionStatus::Completed);

    let state = service.job_state("analyst-1").await.unwrap();
    assert_eq!(state.interviews.status, StageStatus::Completed);
    assert_eq!(state.interviews.scheduled_count, 5);
    assert!(state.interviews.slots.iter().all(|slot| slot.starts_at > state.created_at));
    assert_eq!(
        state.interviews.slots[0].meeting_link.as_deref(),
        Some("https://meet.example/analyst-1-c0")
    );

    // Sequences are dense and the newest entry is the terminal one
    let history = service.history("analyst-1", None).await.unwrap();
    assert_eq!(history[0].sequence, status.sequence);
    assert_eq!(history.len() as u64, status.sequence);
    assert_eq!(history.last().map(|c| c.metadata.source), Some(CheckpointSource::Input));
}

#[tokio::test]
async fn test_disabled_capabilities_take_skip_route() {
    let service = memory_service(&test_config());
    service.create_job_with_id("skip", analyst_input()).await.unwrap();
    service.approve_description("skip").await.unwrap();
    service.add_applicants("skip", strong_candidates(6)).await.unwrap();

    let status = service.approve_shortlist("skip").await.unwrap();
    assert_eq!(status.current_node, node_ids::REVIEW_RESPONSES);
    let state = service.job_state("skip").await.unwrap();
    assert_eq!(state.prescreening.status, StageStatus::Skipped);
    assert!(state.prescreening.scores.is_empty());

    let status = service.record_review("skip", ApprovalStatus::Approved).await.unwrap();
    assert_eq!(status.current_node, node_ids::COMPLETED);
    let state = service.job_state("skip").await.unwrap();
    assert_eq!(state.interviews.status, StageStatus::Skipped);
    assert_eq!(state.interviews.scheduled_count, 0);
}

#[tokio::test]
async fn test_regenerate_produces_new_revision() {
    let service = memory_service(&test_config());
    service.create_job_with_id("regen", analyst_input()).await.unwrap();

    let status = service
        .regenerate_description("regen", "Mention the hybrid schedule")
        .await
        .unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_DESCRIPTION_APPROVAL);

    let state = service.job_state("regen").await.unwrap();
    assert_eq!(state.description.revision, 2);
    assert_eq!(state.description.generation_attempts, 2);
    assert_eq!(state.description.approval_status, ApprovalStatus::Pending);
    let notes = state
        .description
        .sections
        .iter()
        .find(|s| s.heading == "Revision Notes")
        .expect("revision notes section");
    assert!(notes.body.contains("Mention the hybrid schedule"));
}

#[tokio::test]
async fn test_regenerate_requires_feedback() {
    let service = memory_service(&test_config());
    service.create_job_with_id("blank", analyst_input()).await.unwrap();

    let err = service.regenerate_description("blank", "  ").await.unwrap_err();
    assert!(matches!(err, RecruitError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_generation_attempts_are_bounded() {
    let service = memory_service(&test_config());
    service.create_job_with_id("bounded", analyst_input()).await.unwrap();
    service.regenerate_description("bounded", "shorter").await.unwrap();
    service.regenerate_description("bounded", "shorter still").await.unwrap();

    let err = service.regenerate_description("bounded", "again").await.unwrap_err();
    assert_eq!(err.code(), "EXECUTION_FAILED");

    let status = service.job_status("bounded").await.unwrap();
    assert_eq!(status.current_node, node_ids::ERROR);
    assert_eq!(status.status, ExecutionStatus::Errored);
}

#[tokio::test]
async fn test_low_applicants_trigger_optimization() {
    let service = memory_service(&test_config());
    service.create_job_with_id("quiet", analyst_input()).await.unwrap();

    // Round one: below rounds_before_optimize, so wait
    let status = service.approve_description("quiet").await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_APPLICATIONS);

    // Round two with one applicant: optimize, repost, start counting again
    let status = service.add_applicants("quiet", strong_candidates(1)).await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_APPLICATIONS);

    let state = service.job_state("quiet").await.unwrap();
    assert_eq!(state.description.optimization_attempts, 1);
    assert_eq!(state.description.revision, 2);
    assert_eq!(state.posting.posted_revision, Some(2));
    assert_eq!(state.applicants.monitoring_rounds, 1);
    assert!(state.description.sections.iter().any(|s| s.heading == "Why Apply"));

    // Second optimization, then proceed with whoever applied
    let status = service.nudge("quiet").await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_APPLICATIONS);
    let state = service.job_state("quiet").await.unwrap();
    assert_eq!(state.description.optimization_attempts, 2);
    assert_eq!(state.posting.posted_revision, Some(3));

    let status = service.nudge("quiet").await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_SHORTLIST_APPROVAL);
    let state = service.job_state("quiet").await.unwrap();
    assert_eq!(state.applicants.shortlisted_ids, vec!["c0"]);
}

#[tokio::test]
async fn test_rejected_shortlist_waits_for_applicants() {
    let service = memory_service(&test_config());
    service.create_job_with_id("picky", analyst_input()).await.unwrap();
    service.approve_description("picky").await.unwrap();
    service.add_applicants("picky", strong_candidates(5)).await.unwrap();

    let status = service.reject_shortlist("picky").await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_APPLICATIONS);

    let status = service.add_applicants("picky", strong_candidates(7)).await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_SHORTLIST_APPROVAL);
    let state = service.job_state("picky").await.unwrap();
    assert_eq!(state.applicants.candidates.len(), 7);
    assert_eq!(state.applicants.shortlisted_ids.len(), 5);
    assert_eq!(state.applicants.shortlist_approval, ApprovalStatus::Pending);
}

#[tokio::test]
async fn test_recruiter_rejection_closes_job() {
    let service = memory_service(&test_config());
    service.create_job_with_id("nope", analyst_input()).await.unwrap();
    service.approve_description("nope").await.unwrap();
    service.add_applicants("nope", strong_candidates(5)).await.unwrap();
    service.approve_shortlist("nope").await.unwrap();

    let status = service.record_review("nope", ApprovalStatus::Rejected).await.unwrap();
    assert_eq!(status.current_node, node_ids::REJECTED);
    assert_eq!(status.status, ExecutionStatus::Completed);

    let err = service.approve_shortlist("nope").await.unwrap_err();
    assert_eq!(err.code(), "TERMINAL");
}

#[tokio::test]
async fn test_pending_review_stays_parked() {
    let service = memory_service(&test_config());
    service.create_job_with_id("later", analyst_input()).await.unwrap();
    service.approve_description("later").await.unwrap();
    service.add_applicants("later", strong_candidates(5)).await.unwrap();
    let parked = service.approve_shortlist("later").await.unwrap();

    let status = service.record_review("later", ApprovalStatus::Pending).await.unwrap();
    assert_eq!(status.current_node, node_ids::REVIEW_RESPONSES);
    assert!(status.sequence > parked.sequence);
}

#[tokio::test]
async fn test_failed_posting_halts_and_rerun_recovers() {
    let config = test_config();
    let board = Arc::new(SwitchableBoard::default());
    board.down.store(true, Ordering::SeqCst);
    let service = service_with_board(&config, board.clone());

    service.create_job_with_id("flaky", analyst_input()).await.unwrap();
    let err = service.approve_description("flaky").await.unwrap_err();
    match &err {
        RecruitError::Workflow(WorkflowError::Execution(e)) => {
            assert_eq!(e.node, node_ids::POST_JOB);
            assert!(e.error_checkpoint.is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let status = service.job_status("flaky").await.unwrap();
    assert_eq!(status.current_node, node_ids::ERROR);
    assert_eq!(status.status, ExecutionStatus::Errored);
    assert!(status.error_message.unwrap_or_default().contains("503 from upstream"));

    // The error snapshot keeps the last good data
    let state = service.job_state("flaky").await.unwrap();
    assert_eq!(state.description.approval_status, ApprovalStatus::Approved);
    assert!(!state.posting.posted);

    let history = service.history("flaky", None).await.unwrap();
    let before_failure = history
        .iter()
        .find(|c| c.state.get("current_node").and_then(|v| v.as_str()) == Some(node_ids::POST_JOB))
        .expect("checkpoint parked at post-job")
        .sequence;

    board.down.store(false, Ordering::SeqCst);
    let status = service.rerun_job("flaky", before_failure).await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_APPLICATIONS);
    assert_eq!(board.posts.load(Ordering::SeqCst), 1);

    let history = service.history("flaky", None).await.unwrap();
    assert!(history.iter().any(|c| c.metadata.source == CheckpointSource::Rerun));
    assert!(history.iter().any(|c| c.metadata.source == CheckpointSource::Error));
}

#[tokio::test]
async fn test_error_checkpoint_cannot_be_rerun() {
    let board = Arc::new(SwitchableBoard::default());
    board.down.store(true, Ordering::SeqCst);
    let service = service_with_board(&test_config(), board);

    service.create_job_with_id("halted", analyst_input()).await.unwrap();
    service.approve_description("halted").await.unwrap_err();
    let head = service.job_status("halted").await.unwrap().sequence;

    let err = service.rerun_job("halted", head).await.unwrap_err();
    assert_eq!(err.code(), "NOT_RESUMABLE");
}

#[tokio::test]
async fn test_abandoned_job_refuses_resume() {
    let service = memory_service(&test_config());
    service.create_job_with_id("gone", analyst_input()).await.unwrap();

    let status = service.abandon_job("gone", "role frozen").await.unwrap();
    assert_eq!(status.current_node, node_ids::ABANDONED);
    assert_eq!(status.status, ExecutionStatus::Abandoned);

    let err = service.approve_description("gone").await.unwrap_err();
    assert_eq!(err.code(), "ABANDONED");
    let err = service.rerun_job("gone", 1).await.unwrap_err();
    assert_eq!(err.code(), "ABANDONED");

    // Abandoning twice is a no-op
    let again = service.abandon_job("gone", "still frozen").await.unwrap();
    assert_eq!(again.sequence, status.sequence);

    let history = service.history("gone", Some(1)).await.unwrap();
    assert_eq!(history[0].metadata.note.as_deref(), Some("role frozen"));
}

#[tokio::test]
async fn test_regenerate_after_posting_is_refused() {
    let service = memory_service(&test_config());
    service.create_job_with_id("live", analyst_input()).await.unwrap();
    let parked = service.approve_description("live").await.unwrap();
    assert_eq!(parked.current_node, node_ids::AWAIT_APPLICATIONS);

    let err = service.regenerate_description("live", "make it senior").await.unwrap_err();
    assert_eq!(err.code(), "NOT_RESUMABLE");

    let status = service.job_status("live").await.unwrap();
    assert_eq!(status.sequence, parked.sequence);
    assert_eq!(status.status, ExecutionStatus::Interrupted);
    let state = service.job_state("live").await.unwrap();
    assert_eq!(state.description.approval_status, ApprovalStatus::Approved);
    assert!(state.posting.posted);
}

#[tokio::test]
async fn test_shortlist_decision_needs_a_proposed_shortlist() {
    let service = memory_service(&test_config());
    service.create_job_with_id("redo", analyst_input()).await.unwrap();
    service.approve_description("redo").await.unwrap();
    service.add_applicants("redo", strong_candidates(5)).await.unwrap();
    let parked = service.reject_shortlist("redo").await.unwrap();
    assert_eq!(parked.current_node, node_ids::AWAIT_APPLICATIONS);

    let err = service.approve_shortlist("redo").await.unwrap_err();
    assert_eq!(err.code(), "NOT_RESUMABLE");
    let err = service.record_review("redo", ApprovalStatus::Approved).await.unwrap_err();
    assert_eq!(err.code(), "NOT_RESUMABLE");

    let state = service.job_state("redo").await.unwrap();
    assert_eq!(state.applicants.shortlist_approval, ApprovalStatus::Rejected);
    assert_eq!(service.job_status("redo").await.unwrap().sequence, parked.sequence);

    // A re-proposed shortlist waits for a fresh decision
    let status = service.nudge("redo").await.unwrap();
    assert_eq!(status.current_node, node_ids::AWAIT_SHORTLIST_APPROVAL);
    let state = service.job_state("redo").await.unwrap();
    assert_eq!(state.applicants.shortlist_approval, ApprovalStatus::Pending);
}

#[tokio::test]
async fn test_description_decision_refused_at_review() {
    let service = memory_service(&test_config());
    service.create_job_with_id("late", analyst_input()).await.unwrap();
    service.approve_description("late").await.unwrap();
    service.add_applicants("late", strong_candidates(5)).await.unwrap();
    let parked = service.approve_shortlist("late").await.unwrap();
    assert_eq!(parked.current_node, node_ids::REVIEW_RESPONSES);

    let err = service.approve_description("late").await.unwrap_err();
    assert_eq!(err.code(), "NOT_RESUMABLE");
    let err = service.reject_shortlist("late").await.unwrap_err();
    assert_eq!(err.code(), "NOT_RESUMABLE");
    assert_eq!(service.job_status("late").await.unwrap().sequence, parked.sequence);
}

#[tokio::test]
async fn test_zero_applicant_threshold_is_rejected() {
    let mut config = test_config();
    config.workflow.min_applicants = 0;

    let err = recruitflow::RecruitmentService::with_store(
        &config,
        Arc::new(workflow_checkpoint::InMemoryCheckpointStore::new()),
    )
    .err()
    .expect("zero threshold must be refused");
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_create_refuses_halted_job() {
    let board = Arc::new(SwitchableBoard::default());
    board.down.store(true, Ordering::SeqCst);
    let service = service_with_board(&test_config(), board);

    service.create_job_with_id("stuck", analyst_input()).await.unwrap();
    service.approve_description("stuck").await.unwrap_err();
    let halted = service.job_status("stuck").await.unwrap().sequence;

    let err = service.create_job_with_id("stuck", analyst_input()).await.unwrap_err();
    assert_eq!(err.code(), "TERMINAL");
    assert_eq!(service.job_status("stuck").await.unwrap().sequence, halted);
}

#[tokio::test]
async fn test_create_is_idempotent_per_job_id() {
    let service = memory_service(&test_config());
    let first = service.create_job_with_id("twice", analyst_input()).await.unwrap();
    let second = service.create_job_with_id("twice", analyst_input()).await.unwrap();
    assert_eq!(first.sequence, second.sequence);
    assert_eq!(second.current_node, node_ids::AWAIT_DESCRIPTION_APPROVAL);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let service = memory_service(&test_config());
    let err = service.job_status("missing").await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    let err = service.add_applicants("missing", strong_candidates(1)).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_any_checkpoint() {
    let service = memory_service(&test_config());
    let mut input = analyst_input();
    input.role_title = " ".to_string();

    let err = service.create_job_with_id("bad", input).await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(service.job_status("bad").await.unwrap_err().code(), "NOT_FOUND");
}
