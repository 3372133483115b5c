//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the persistence gateway and the payment gateway). Each trait exposes
//! strongly typed errors so adapters map their failures into predictable
//! variants instead of returning a catch-all.

use async_trait::async_trait;
use thiserror::Error;

use super::{Course, DomainError, Enrollment, TerminalStatus, TransitionKey};

/// Errors surfaced by the SQL-backed repositories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Connectivity or pool-checkout failure.
    #[error("repository connection failed: {message}")]
    Connection {
        /// Adapter-level detail.
        message: String,
    },
    /// Statement execution failed for a reason other than a constraint.
    #[error("repository query failed: {message}")]
    Query {
        /// Adapter-level detail.
        message: String,
    },
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {message}")]
    UniqueViolation {
        /// Adapter-level detail.
        message: String,
    },
    /// A foreign key rejected the write (missing student or course).
    #[error("foreign key violated: {message}")]
    ForeignKeyViolation {
        /// Adapter-level detail.
        message: String,
    },
    /// A stored value failed to decode into its domain type.
    #[error("stored value corrupt: {message}")]
    Integrity {
        /// Adapter-level detail.
        message: String,
    },
}

impl RepositoryError {
    /// Helper for connection failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for generic query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Helper for uniqueness violations.
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self::UniqueViolation {
            message: message.into(),
        }
    }

    /// Helper for foreign key violations.
    pub fn foreign_key_violation(message: impl Into<String>) -> Self {
        Self::ForeignKeyViolation {
            message: message.into(),
        }
    }

    /// Helper for corrupt stored values.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

impl From<RepositoryError> for DomainError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::ForeignKeyViolation { message } => Self::validation(message),
            // With the pair-wide uniqueness constraint dropped, any unique
            // violation that reaches the domain is unexpected.
            RepositoryError::Integrity { message }
            | RepositoryError::UniqueViolation { message }
            | RepositoryError::Connection { message }
            | RepositoryError::Query { message } => Self::integrity(message),
        }
    }
}

/// Fields of an enrollment row to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrollment {
    /// Purchasing student's user id.
    pub student_id: i64,
    /// Purchased course id.
    pub course_id: i64,
    /// Checkout-session reference, when the row is minted by checkout
    /// initiation. Must already exist gateway-side when provided.
    pub external_ref: Option<String>,
}

/// Persistence port for enrollment rows.
///
/// `apply_transition` is the single atomic primitive the whole confirmation
/// design rests on: a conditional update that only fires while the row is
/// still `pending`. Implementations must express it as one statement, never
/// read-then-write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert a new pending row and return it with its generated id.
    async fn create(&self, new: NewEnrollment) -> Result<Enrollment, RepositoryError>;

    /// Fetch a row by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Enrollment>, RepositoryError>;

    /// Fetch a row by its bound external reference.
    async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Enrollment>, RepositoryError>;

    /// Whether a `completed` row exists for the (student, course) pair.
    async fn has_completed(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<bool, RepositoryError>;

    /// Conditionally settle the row identified by `key` to `target`,
    /// returning the number of rows updated (0 when the row is already
    /// terminal or absent).
    async fn apply_transition(
        &self,
        key: &TransitionKey,
        target: TerminalStatus,
    ) -> Result<u64, RepositoryError>;
}

/// Read-side persistence port for courses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Fetch a course by id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Course>, RepositoryError>;

    /// Courses for which the student holds a completed enrollment, newest
    /// purchase first. Exercises the bulk decode path of the list column.
    async fn list_enrolled(&self, student_id: i64) -> Result<Vec<Course>, RepositoryError>;
}

/// Errors surfaced by the payment gateway adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentGatewayError {
    /// The call exceeded its deadline; safe to retry.
    #[error("payment gateway call timed out")]
    Timeout,
    /// Transport-level failure reaching the gateway.
    #[error("payment gateway unreachable: {message}")]
    Transport {
        /// Adapter-level detail.
        message: String,
    },
    /// The gateway answered with a non-success status.
    #[error("payment gateway rejected the call ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Gateway-provided detail.
        message: String,
    },
    /// The gateway response failed to decode.
    #[error("payment gateway response invalid: {message}")]
    Decode {
        /// Adapter-level detail.
        message: String,
    },
}

impl PaymentGatewayError {
    /// Helper for transport failures.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Helper for decode failures.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

impl From<PaymentGatewayError> for DomainError {
    fn from(error: PaymentGatewayError) -> Self {
        Self::upstream(error.to_string())
    }
}

/// Request to mint a checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Course being purchased.
    pub course_id: i64,
    /// Purchasing student.
    pub student_id: i64,
    /// Student email forwarded into session metadata.
    pub student_email: String,
    /// Line-item name shown on the hosted checkout page.
    pub description: String,
    /// Optional line-item image.
    pub thumbnail_url: Option<String>,
    /// Amount in minor currency units.
    pub amount_minor: i64,
    /// ISO currency code, lowercase.
    pub currency: String,
    /// Redirect target after successful payment.
    pub success_url: String,
    /// Redirect target after abandonment.
    pub cancel_url: String,
}

/// A freshly minted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Gateway-assigned session reference.
    pub reference: String,
    /// Hosted checkout URL the client is redirected to.
    pub url: String,
}

/// Gateway-side view of a session, fetched on the pull path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Gateway-assigned session reference.
    pub reference: String,
    /// Whether the gateway reports the session as paid.
    pub paid: bool,
    /// Raw payment status string, echoed to clients.
    pub payment_status: String,
    /// Course id recovered from session metadata, when present.
    pub course_id: Option<i64>,
}

/// Outbound port for the external payment processor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Mint a checkout session for one course purchase.
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentGatewayError>;

    /// Retrieve the gateway's current view of a session.
    async fn retrieve_session(&self, reference: &str)
        -> Result<SessionView, PaymentGatewayError>;
}
