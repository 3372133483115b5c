//! Authoritative state machine for purchase-intent rows.
//!
//! The engine owns no in-process state; every operation reduces to one
//! repository call, and all coordination between concurrent confirmation
//! deliveries collapses into the repository's conditional transition update.
//! Creation is deliberately lenient (multiple pending rows per pair are
//! allowed) while the completed check is strict; callers gate duplicate
//! purchases with [`EnrollmentEngine::check_completed`] before creating.

use std::sync::Arc;

use tracing::{debug, info};

use super::ports::{EnrollmentRepository, NewEnrollment};
use super::{DomainError, DomainResult, Enrollment, TerminalStatus, TransitionKey};

/// Outcome of a transition request.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The row moved out of `pending` into the requested terminal state.
    Applied(Enrollment),
    /// The row was already terminal; nothing changed. Reapplying the current
    /// terminal status and receiving a late contradictory event both land
    /// here, because terminal states absorb all further events.
    AlreadySettled(Enrollment),
}

impl TransitionOutcome {
    /// The enrollment row after the operation.
    pub fn enrollment(&self) -> &Enrollment {
        match self {
            Self::Applied(e) | Self::AlreadySettled(e) => e,
        }
    }
}

/// Enrollment lifecycle service.
#[derive(Clone)]
pub struct EnrollmentEngine {
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentEngine {
    /// Build the engine over an enrollment repository.
    pub fn new(enrollments: Arc<dyn EnrollmentRepository>) -> Self {
        Self { enrollments }
    }

    /// Create a `pending` row for the pair, optionally bound to a
    /// checkout-session reference.
    ///
    /// Does not check for a prior completed enrollment; that guard belongs
    /// to the caller so that retries after failed attempts stay possible.
    /// Missing student or course rows surface as validation errors via the
    /// foreign keys.
    ///
    /// # Errors
    ///
    /// Propagates repository failures mapped into the domain taxonomy.
    pub async fn create_pending(
        &self,
        student_id: i64,
        course_id: i64,
        external_ref: Option<String>,
    ) -> DomainResult<Enrollment> {
        let enrollment = self
            .enrollments
            .create(NewEnrollment {
                student_id,
                course_id,
                external_ref,
            })
            .await?;
        info!(
            enrollment_id = enrollment.id,
            student_id,
            course_id,
            external_ref = enrollment.external_ref.as_deref(),
            "pending enrollment created"
        );
        Ok(enrollment)
    }

    /// Whether a `completed` row exists for the pair. Pending and failed
    /// rows never count.
    ///
    /// # Errors
    ///
    /// Propagates repository failures mapped into the domain taxonomy.
    pub async fn check_completed(&self, student_id: i64, course_id: i64) -> DomainResult<bool> {
        Ok(self.enrollments.has_completed(student_id, course_id).await?)
    }

    /// Fetch the row bound to `external_ref`, if any.
    ///
    /// # Errors
    ///
    /// Propagates repository failures mapped into the domain taxonomy.
    pub async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> DomainResult<Option<Enrollment>> {
        Ok(self.enrollments.find_by_external_ref(external_ref).await?)
    }

    /// Settle the row located by `key` into `target`.
    ///
    /// Idempotent and order independent: the underlying update only fires
    /// while the row is still `pending`, so duplicate deliveries and races
    /// between contradictory events resolve to exactly one terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] when no row matches `key`;
    /// repository failures are mapped into the domain taxonomy.
    pub async fn transition(
        &self,
        key: &TransitionKey,
        target: TerminalStatus,
    ) -> DomainResult<TransitionOutcome> {
        let updated = self.enrollments.apply_transition(key, target).await?;
        let row = self.fetch(key).await?.ok_or_else(|| {
            DomainError::not_found(format!("no enrollment matches {key}"))
        })?;
        if updated > 0 {
            info!(
                enrollment_id = row.id,
                status = %row.status,
                "enrollment settled"
            );
            Ok(TransitionOutcome::Applied(row))
        } else {
            debug!(
                enrollment_id = row.id,
                status = %row.status,
                requested = %target,
                "transition ignored; row already terminal"
            );
            Ok(TransitionOutcome::AlreadySettled(row))
        }
    }

    async fn fetch(&self, key: &TransitionKey) -> DomainResult<Option<Enrollment>> {
        let row = match key {
            TransitionKey::Id(id) => self.enrollments.find_by_id(*id).await?,
            TransitionKey::ExternalRef(r) => self.enrollments.find_by_external_ref(r).await?,
        };
        Ok(row)
    }
}
