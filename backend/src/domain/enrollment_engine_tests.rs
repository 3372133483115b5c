//! Tests for the enrollment state engine over a mocked repository.

use std::sync::Arc;

use chrono::Utc;
use mockall::predicate::eq;

use super::ports::{MockEnrollmentRepository, RepositoryError};
use super::{
    DomainError, Enrollment, EnrollmentEngine, EnrollmentStatus, TerminalStatus, TransitionKey,
    TransitionOutcome,
};

fn row(id: i64, status: EnrollmentStatus) -> Enrollment {
    Enrollment {
        id,
        student_id: 11,
        course_id: 42,
        external_ref: Some("cs_test_123".to_owned()),
        status,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn create_pending_returns_generated_row() {
    let mut repo = MockEnrollmentRepository::new();
    repo.expect_create()
        .withf(|new| new.student_id == 11 && new.course_id == 42 && new.external_ref.is_none())
        .times(1)
        .return_once(|_| Ok(row(1, EnrollmentStatus::Pending)));

    let engine = EnrollmentEngine::new(Arc::new(repo));
    let enrollment = engine
        .create_pending(11, 42, None)
        .await
        .expect("create succeeds");
    assert_eq!(enrollment.status, EnrollmentStatus::Pending);
}

#[tokio::test]
async fn create_pending_maps_missing_parent_to_validation() {
    let mut repo = MockEnrollmentRepository::new();
    repo.expect_create()
        .return_once(|_| Err(RepositoryError::foreign_key_violation("no such course")));

    let engine = EnrollmentEngine::new(Arc::new(repo));
    let err = engine.create_pending(11, 999, None).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn transition_applies_when_row_was_pending() {
    let mut repo = MockEnrollmentRepository::new();
    repo.expect_apply_transition()
        .with(
            eq(TransitionKey::ExternalRef("cs_test_123".to_owned())),
            eq(TerminalStatus::Completed),
        )
        .times(1)
        .return_once(|_, _| Ok(1));
    repo.expect_find_by_external_ref()
        .with(eq("cs_test_123"))
        .return_once(|_| Ok(Some(row(1, EnrollmentStatus::Completed))));

    let engine = EnrollmentEngine::new(Arc::new(repo));
    let outcome = engine
        .transition(
            &TransitionKey::ExternalRef("cs_test_123".to_owned()),
            TerminalStatus::Completed,
        )
        .await
        .expect("transition succeeds");
    assert!(matches!(outcome, TransitionOutcome::Applied(_)));
    assert_eq!(outcome.enrollment().status, EnrollmentStatus::Completed);
}

#[tokio::test]
async fn transition_on_terminal_row_is_a_noop_success() {
    let mut repo = MockEnrollmentRepository::new();
    repo.expect_apply_transition().return_once(|_, _| Ok(0));
    repo.expect_find_by_id()
        .with(eq(1))
        .return_once(|_| Ok(Some(row(1, EnrollmentStatus::Completed))));

    let engine = EnrollmentEngine::new(Arc::new(repo));
    // A late "failed" event must not regress a completed row.
    let outcome = engine
        .transition(&TransitionKey::Id(1), TerminalStatus::Failed)
        .await
        .expect("late contradictory event is absorbed");
    assert!(matches!(outcome, TransitionOutcome::AlreadySettled(_)));
    assert_eq!(outcome.enrollment().status, EnrollmentStatus::Completed);
}

#[tokio::test]
async fn transition_on_unknown_key_is_not_found() {
    let mut repo = MockEnrollmentRepository::new();
    repo.expect_apply_transition().return_once(|_, _| Ok(0));
    repo.expect_find_by_external_ref()
        .return_once(|_| Ok(None));

    let engine = EnrollmentEngine::new(Arc::new(repo));
    let err = engine
        .transition(
            &TransitionKey::ExternalRef("cs_missing".to_owned()),
            TerminalStatus::Completed,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn check_completed_reflects_repository_answer() {
    let mut repo = MockEnrollmentRepository::new();
    repo.expect_has_completed()
        .with(eq(11), eq(42))
        .return_once(|_, _| Ok(true));

    let engine = EnrollmentEngine::new(Arc::new(repo));
    assert!(engine.check_completed(11, 42).await.expect("check succeeds"));
}
