//! Tests for the payment confirmation reconciler over mocked ports.

use std::sync::Arc;

use chrono::Utc;
use mockall::predicate::eq;
use rust_decimal_macros::dec;

use super::ports::{
    CheckoutSession, MockCourseRepository, MockEnrollmentRepository, MockPaymentGateway,
    PaymentGatewayError, SessionView,
};
use super::{
    ConfirmationEvent, ConfirmationKind, Course, CheckoutSettings, DomainError, Enrollment,
    EnrollmentEngine, EnrollmentStatus, EventDisposition, Identity, PaymentReconciler, Role,
};

fn settings() -> CheckoutSettings {
    CheckoutSettings {
        currency: "usd".to_owned(),
        frontend_base_url: "http://localhost:5173".to_owned(),
    }
}

fn student() -> Identity {
    Identity {
        user_id: 11,
        email: "ada@example.com".to_owned(),
        role: Role::Student,
    }
}

fn course() -> Course {
    Course {
        id: 42,
        teacher_id: 1,
        title: "Ownership in Depth".to_owned(),
        description: "Borrowing, lifetimes, and aliasing".to_owned(),
        content_urls: vec!["https://cdn.example/1.mp4".to_owned()],
        price: dec!(49.99),
        thumbnail_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn pending_row(external_ref: Option<&str>) -> Enrollment {
    Enrollment {
        id: 1,
        student_id: 11,
        course_id: 42,
        external_ref: external_ref.map(str::to_owned),
        status: EnrollmentStatus::Pending,
        created_at: Utc::now(),
    }
}

fn reconciler(
    courses: MockCourseRepository,
    enrollments: MockEnrollmentRepository,
    gateway: MockPaymentGateway,
) -> PaymentReconciler {
    PaymentReconciler::new(
        Arc::new(courses),
        EnrollmentEngine::new(Arc::new(enrollments)),
        Arc::new(gateway),
        settings(),
    )
}

#[tokio::test]
async fn checkout_mints_in_minor_units_then_creates_bound_row() {
    let mut courses = MockCourseRepository::new();
    courses
        .expect_find_by_id()
        .with(eq(42))
        .return_once(|_| Ok(Some(course())));

    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_has_completed()
        .return_once(|_, _| Ok(false));
    enrollments
        .expect_create()
        .withf(|new| new.external_ref.as_deref() == Some("cs_test_123"))
        .times(1)
        .return_once(|_| Ok(pending_row(Some("cs_test_123"))));

    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_checkout_session()
        .withf(|req| req.amount_minor == 4999 && req.currency == "usd")
        .times(1)
        .return_once(|_| {
            Ok(CheckoutSession {
                reference: "cs_test_123".to_owned(),
                url: "https://pay.example/cs_test_123".to_owned(),
            })
        });

    let session = reconciler(courses, enrollments, gateway)
        .begin_checkout(&student(), 42)
        .await
        .expect("checkout succeeds");
    assert_eq!(session.reference, "cs_test_123");
}

#[tokio::test]
async fn mint_failure_leaves_no_pending_row() {
    let mut courses = MockCourseRepository::new();
    courses
        .expect_find_by_id()
        .return_once(|_| Ok(Some(course())));

    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_has_completed()
        .return_once(|_, _| Ok(false));
    // No expect_create: an insert after a failed mint would panic the mock.

    let mut gateway = MockPaymentGateway::new();
    gateway
        .expect_create_checkout_session()
        .return_once(|_| Err(PaymentGatewayError::Timeout));

    let err = reconciler(courses, enrollments, gateway)
        .begin_checkout(&student(), 42)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Upstream(_)));
}

#[tokio::test]
async fn checkout_rejects_existing_completed_enrollment() {
    let mut courses = MockCourseRepository::new();
    courses
        .expect_find_by_id()
        .return_once(|_| Ok(Some(course())));

    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_has_completed()
        .with(eq(11), eq(42))
        .return_once(|_, _| Ok(true));

    let gateway = MockPaymentGateway::new();
    let err = reconciler(courses, enrollments, gateway)
        .begin_checkout(&student(), 42)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn checkout_rejects_unknown_course() {
    let mut courses = MockCourseRepository::new();
    courses.expect_find_by_id().return_once(|_| Ok(None));

    let err = reconciler(
        courses,
        MockEnrollmentRepository::new(),
        MockPaymentGateway::new(),
    )
    .begin_checkout(&student(), 999)
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn completed_event_settles_the_referenced_row() {
    let courses = MockCourseRepository::new();
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_apply_transition()
        .times(1)
        .return_once(|_, _| Ok(1));
    enrollments.expect_find_by_external_ref().return_once(|_| {
        Ok(Some(Enrollment {
            status: EnrollmentStatus::Completed,
            ..pending_row(Some("cs_test_123"))
        }))
    });

    let disposition = reconciler(courses, enrollments, MockPaymentGateway::new())
        .apply_event(&ConfirmationEvent {
            kind: ConfirmationKind::SessionCompleted,
            reference: "cs_test_123".to_owned(),
        })
        .await
        .expect("event applies");
    assert_eq!(
        disposition,
        EventDisposition::Settled(EnrollmentStatus::Completed)
    );
}

#[tokio::test]
async fn unmatched_event_is_acknowledged_without_mutation() {
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_apply_transition()
        .return_once(|_, _| Ok(0));
    enrollments
        .expect_find_by_external_ref()
        .return_once(|_| Ok(None));

    let disposition = reconciler(
        MockCourseRepository::new(),
        enrollments,
        MockPaymentGateway::new(),
    )
    .apply_event(&ConfirmationEvent {
        kind: ConfirmationKind::SessionCompleted,
        reference: "cs_unknown".to_owned(),
    })
    .await
    .expect("unmatched event is not an error");
    assert_eq!(disposition, EventDisposition::Unmatched);
}

#[tokio::test]
async fn unknown_event_kind_is_ignored() {
    let disposition = reconciler(
        MockCourseRepository::new(),
        MockEnrollmentRepository::new(),
        MockPaymentGateway::new(),
    )
    .apply_event(&ConfirmationEvent {
        kind: ConfirmationKind::Other("invoice.created".to_owned()),
        reference: "in_123".to_owned(),
    })
    .await
    .expect("foreign event kinds are acknowledged");
    assert_eq!(disposition, EventDisposition::Ignored);
}

#[tokio::test]
async fn pull_verification_settles_a_still_pending_row() {
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_find_by_external_ref()
        .with(eq("cs_test_123"))
        .times(1)
        .return_once(|_| Ok(Some(pending_row(Some("cs_test_123")))));
    enrollments
        .expect_apply_transition()
        .times(1)
        .return_once(|_, _| Ok(1));
    // Second lookup happens inside the transition fetch.
    enrollments.expect_find_by_external_ref().return_once(|_| {
        Ok(Some(Enrollment {
            status: EnrollmentStatus::Completed,
            ..pending_row(Some("cs_test_123"))
        }))
    });

    let mut gateway = MockPaymentGateway::new();
    gateway.expect_retrieve_session().return_once(|_| {
        Ok(SessionView {
            reference: "cs_test_123".to_owned(),
            paid: true,
            payment_status: "paid".to_owned(),
            course_id: Some(42),
        })
    });

    let report = reconciler(MockCourseRepository::new(), enrollments, gateway)
        .verify_session("cs_test_123")
        .await
        .expect("verification succeeds");
    assert!(report.success);
    assert_eq!(report.course_id, Some(42));
}

#[tokio::test]
async fn pull_verification_after_webhook_is_a_pure_read() {
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments.expect_find_by_external_ref().return_once(|_| {
        Ok(Some(Enrollment {
            status: EnrollmentStatus::Completed,
            ..pending_row(Some("cs_test_123"))
        }))
    });
    // No expect_apply_transition: a second mutation would panic the mock.

    let mut gateway = MockPaymentGateway::new();
    gateway.expect_retrieve_session().return_once(|_| {
        Ok(SessionView {
            reference: "cs_test_123".to_owned(),
            paid: true,
            payment_status: "paid".to_owned(),
            course_id: Some(42),
        })
    });

    let report = reconciler(MockCourseRepository::new(), enrollments, gateway)
        .verify_session("cs_test_123")
        .await
        .expect("verification succeeds");
    assert!(report.success);
}

#[tokio::test]
async fn unpaid_session_reports_failure_without_touching_storage() {
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_retrieve_session().return_once(|_| {
        Ok(SessionView {
            reference: "cs_test_123".to_owned(),
            paid: false,
            payment_status: "unpaid".to_owned(),
            course_id: Some(42),
        })
    });

    let report = reconciler(
        MockCourseRepository::new(),
        MockEnrollmentRepository::new(),
        gateway,
    )
    .verify_session("cs_test_123")
    .await
    .expect("verification succeeds");
    assert!(!report.success);
    assert_eq!(report.payment_status, "unpaid");
}

#[tokio::test]
async fn record_purchase_creates_unbound_pending_row() {
    let mut courses = MockCourseRepository::new();
    courses
        .expect_find_by_id()
        .return_once(|_| Ok(Some(course())));

    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_has_completed()
        .return_once(|_, _| Ok(false));
    enrollments
        .expect_create()
        .withf(|new| new.external_ref.is_none())
        .return_once(|_| Ok(pending_row(None)));

    let enrollment = reconciler(courses, enrollments, MockPaymentGateway::new())
        .record_purchase(&student(), 42)
        .await
        .expect("purchase recorded");
    assert_eq!(enrollment.status, EnrollmentStatus::Pending);
    assert!(enrollment.external_ref.is_none());
}
