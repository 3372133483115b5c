//! Domain types, ports, and services.
//!
//! Everything in this module is transport and storage agnostic. The two
//! services — [`EnrollmentEngine`] and [`PaymentReconciler`] — depend only
//! on the ports in [`ports`]; adapters live under `crate::outbound` and
//! `crate::api`.

pub mod course;
pub mod enrollment;
pub mod enrollment_engine;
pub mod error;
pub mod ports;
pub mod reconciliation;
pub mod user;

pub use self::course::Course;
pub use self::enrollment::{
    Enrollment, EnrollmentStatus, EnrollmentStatusParseError, TerminalStatus, TransitionKey,
};
pub use self::enrollment_engine::{EnrollmentEngine, TransitionOutcome};
pub use self::error::{DomainError, DomainResult};
pub use self::reconciliation::{
    CheckoutSettings, ConfirmationEvent, ConfirmationKind, EventDisposition, PaymentReconciler,
    VerificationReport,
};
pub use self::user::{Identity, Role, RoleParseError};

#[cfg(test)]
mod enrollment_engine_tests;
#[cfg(test)]
mod reconciliation_tests;
