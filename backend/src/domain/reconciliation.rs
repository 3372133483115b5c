//! Payment confirmation reconciler.
//!
//! Reconciles locally created purchase intents against the gateway's
//! confirmation signals. Two entry paths converge on the engine's transition
//! operation: the push path (verified webhook events) and the pull path
//! (client-triggered session verification). Both are idempotent and
//! mutually order independent; whichever runs first settles the row and the
//! other collapses into a no-op.

use std::sync::Arc;

use tracing::{info, warn};

use super::ports::{CheckoutRequest, CheckoutSession, CourseRepository, PaymentGateway};
use super::{
    Course, DomainError, DomainResult, Enrollment, EnrollmentEngine, EnrollmentStatus, Identity,
    TerminalStatus, TransitionKey, TransitionOutcome,
};

/// Checkout parameters that are deployment configuration, not request data.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// ISO currency code for all line items, lowercase.
    pub currency: String,
    /// Base URL the hosted checkout page redirects back to.
    pub frontend_base_url: String,
}

impl CheckoutSettings {
    fn success_url(&self) -> String {
        format!(
            "{}/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            self.frontend_base_url
        )
    }

    fn cancel_url(&self, course_id: i64) -> String {
        format!("{}/courses/{course_id}", self.frontend_base_url)
    }
}

/// Kind of a verified confirmation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationKind {
    /// The checkout session completed; payment captured.
    SessionCompleted,
    /// The checkout session expired unpaid.
    SessionExpired,
    /// The payment attempt failed.
    PaymentFailed,
    /// Any other event kind the gateway emits; acknowledged and ignored.
    Other(String),
}

/// A confirmation event whose signature has already been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEvent {
    /// Event kind.
    pub kind: ConfirmationKind,
    /// Checkout-session reference the event is about.
    pub reference: String,
}

/// How the reconciler disposed of a confirmation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDisposition {
    /// The referenced row was settled by this event.
    Settled(EnrollmentStatus),
    /// The referenced row was already terminal; duplicate or late delivery.
    AlreadySettled(EnrollmentStatus),
    /// No local row matches the reference. Acknowledged so the sender stops
    /// retrying, but logged for operator visibility.
    Unmatched,
    /// Event kind carries no enrollment consequence.
    Ignored,
}

/// Result of pull-path session verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Whether the gateway reports the session as paid.
    pub success: bool,
    /// Raw gateway payment status, echoed to the client.
    pub payment_status: String,
    /// Course id recovered from session metadata, when present.
    pub course_id: Option<i64>,
}

/// Reconciles purchase intents with gateway confirmations.
#[derive(Clone)]
pub struct PaymentReconciler {
    courses: Arc<dyn CourseRepository>,
    engine: EnrollmentEngine,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl PaymentReconciler {
    /// Build the reconciler over its collaborator ports.
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        engine: EnrollmentEngine,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            courses,
            engine,
            gateway,
            settings,
        }
    }

    /// Initiate a checkout: mint a session gateway-side, then record the
    /// bound pending row.
    ///
    /// The mint strictly precedes the insert so a mint failure never leaves
    /// an orphan pending row; a crash between the two leaves only an
    /// unreferenced session that expires gateway-side.
    ///
    /// # Errors
    ///
    /// [`DomainError::NotFound`] when the course does not exist,
    /// [`DomainError::Conflict`] when the requester already holds a
    /// completed enrollment, [`DomainError::Upstream`] when the mint fails.
    pub async fn begin_checkout(
        &self,
        identity: &Identity,
        course_id: i64,
    ) -> DomainResult<CheckoutSession> {
        let course = self.guarded_course(identity, course_id).await?;
        let amount_minor = course.price_minor_units()?;

        let session = self
            .gateway
            .create_checkout_session(CheckoutRequest {
                course_id: course.id,
                student_id: identity.user_id,
                student_email: identity.email.clone(),
                description: course.title.clone(),
                thumbnail_url: course.thumbnail_url.clone(),
                amount_minor,
                currency: self.settings.currency.clone(),
                success_url: self.settings.success_url(),
                cancel_url: self.settings.cancel_url(course.id),
            })
            .await?;

        self.engine
            .create_pending(identity.user_id, course.id, Some(session.reference.clone()))
            .await?;
        info!(
            course_id,
            student_id = identity.user_id,
            reference = %session.reference,
            amount_minor,
            "checkout session minted"
        );
        Ok(session)
    }

    /// Record a purchase intent without minting a session.
    ///
    /// # Errors
    ///
    /// Same guards as [`PaymentReconciler::begin_checkout`], minus the
    /// upstream call.
    pub async fn record_purchase(
        &self,
        identity: &Identity,
        course_id: i64,
    ) -> DomainResult<Enrollment> {
        let course = self.guarded_course(identity, course_id).await?;
        self.engine
            .create_pending(identity.user_id, course.id, None)
            .await
    }

    /// Apply a verified confirmation event (push path).
    ///
    /// # Errors
    ///
    /// Only storage failures error; an unmatched reference is a normal
    /// disposition so the sender's retries stop.
    pub async fn apply_event(&self, event: &ConfirmationEvent) -> DomainResult<EventDisposition> {
        let target = match &event.kind {
            ConfirmationKind::SessionCompleted => TerminalStatus::Completed,
            ConfirmationKind::SessionExpired | ConfirmationKind::PaymentFailed => {
                TerminalStatus::Failed
            }
            ConfirmationKind::Other(kind) => {
                info!(kind = %kind, reference = %event.reference, "ignoring event kind");
                return Ok(EventDisposition::Ignored);
            }
        };

        let key = TransitionKey::ExternalRef(event.reference.clone());
        match self.engine.transition(&key, target).await {
            Ok(TransitionOutcome::Applied(row)) => Ok(EventDisposition::Settled(row.status)),
            Ok(TransitionOutcome::AlreadySettled(row)) => {
                Ok(EventDisposition::AlreadySettled(row.status))
            }
            Err(DomainError::NotFound(_)) => {
                warn!(
                    reference = %event.reference,
                    "confirmation event matches no local enrollment"
                );
                Ok(EventDisposition::Unmatched)
            }
            Err(other) => Err(other),
        }
    }

    /// Verify a session against the gateway (pull path) and settle the
    /// local row when the gateway reports it paid.
    ///
    /// # Errors
    ///
    /// [`DomainError::Upstream`] when the gateway lookup fails; storage
    /// failures are mapped into the domain taxonomy.
    pub async fn verify_session(&self, reference: &str) -> DomainResult<VerificationReport> {
        let view = self.gateway.retrieve_session(reference).await?;
        if !view.paid {
            return Ok(VerificationReport {
                success: false,
                payment_status: view.payment_status,
                course_id: view.course_id,
            });
        }

        match self.engine.find_by_external_ref(reference).await? {
            Some(row) if row.status != EnrollmentStatus::Completed => {
                self.engine
                    .transition(
                        &TransitionKey::ExternalRef(reference.to_owned()),
                        TerminalStatus::Completed,
                    )
                    .await?;
            }
            Some(_) => {
                // Push path got here first; nothing left to do.
            }
            None => {
                warn!(reference, "paid session matches no local enrollment");
            }
        }
        Ok(VerificationReport {
            success: true,
            payment_status: view.payment_status,
            course_id: view.course_id,
        })
    }

    /// Shared checkout guards: the course must exist and the requester must
    /// not already hold a completed enrollment for it.
    async fn guarded_course(&self, identity: &Identity, course_id: i64) -> DomainResult<Course> {
        let course = self
            .courses
            .find_by_id(course_id)
            .await
            .map_err(DomainError::from)?
            .ok_or_else(|| DomainError::not_found(format!("course {course_id} not found")))?;
        if self
            .engine
            .check_completed(identity.user_id, course_id)
            .await?
        {
            return Err(DomainError::conflict(
                "already enrolled in this course".to_owned(),
            ));
        }
        Ok(course)
    }
}
