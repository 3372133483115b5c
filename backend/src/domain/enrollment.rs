//! Enrollment lifecycle types.
//!
//! An enrollment is the purchase-intent row minted at checkout time. Its
//! status moves `pending -> {completed, failed}` exactly once; both terminal
//! states absorb every later event as a no-op because confirmation delivery
//! is at-least-once and unordered. Rows are never deleted; the table doubles
//! as the purchase audit trail.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// Purchase intent created, confirmation outstanding.
    Pending,
    /// Payment confirmed; grants content access. Terminal.
    Completed,
    /// Payment failed or the checkout session expired. Terminal.
    Failed,
}

impl EnrollmentStatus {
    /// Canonical storage spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the state absorbs further transition events.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is unrecognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown enrollment status: {0}")]
pub struct EnrollmentStatusParseError(pub String);

impl FromStr for EnrollmentStatus {
    type Err = EnrollmentStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(EnrollmentStatusParseError(other.to_owned())),
        }
    }
}

/// Target of a transition request: only the two terminal states are ever
/// requested, so `pending` is unrepresentable as a target by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalStatus {
    /// Settle the purchase as paid.
    Completed,
    /// Settle the purchase as failed or expired.
    Failed,
}

impl TerminalStatus {
    /// The equivalent lifecycle state.
    pub fn as_status(self) -> EnrollmentStatus {
        match self {
            Self::Completed => EnrollmentStatus::Completed,
            Self::Failed => EnrollmentStatus::Failed,
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_status().fmt(f)
    }
}

/// A stored enrollment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Engine-generated identifier.
    pub id: i64,
    /// Purchasing student's user id.
    pub student_id: i64,
    /// Purchased course id.
    pub course_id: i64,
    /// Checkout-session reference assigned by the payment gateway.
    /// Immutable and globally unique once bound; absent for purchases
    /// recorded without a session mint.
    pub external_ref: Option<String>,
    /// Lifecycle state.
    pub status: EnrollmentStatus,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// Locator for a transition: either the row id or its bound external
/// reference. The push and pull confirmation paths only ever know the
/// reference; internal callers may hold the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKey {
    /// Row identifier.
    Id(i64),
    /// Bound checkout-session reference.
    ExternalRef(String),
}

impl fmt::Display for TransitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::ExternalRef(r) => write!(f, "ref={r}"),
        }
    }
}
