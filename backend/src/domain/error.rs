//! Domain-level error taxonomy.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! statuses; outbound adapters map their own failures into the matching
//! category before the error crosses back into the domain.

use thiserror::Error;

/// Failure categories surfaced by domain services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DomainError {
    /// The request is malformed or fails a domain validation rule.
    #[error("{0}")]
    Validation(String),
    /// The referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Authenticated but not permitted to perform this action.
    #[error("{0}")]
    Authorization(String),
    /// The operation conflicts with existing state, e.g. a duplicate
    /// completed enrollment.
    #[error("{0}")]
    Conflict(String),
    /// The payment gateway is unreachable, timed out, or rejected the call.
    /// Retryable from the caller's point of view.
    #[error("payment gateway failure: {0}")]
    Upstream(String),
    /// Stored data violates an invariant the schema should have upheld, or a
    /// stored encoded value failed to decode.
    #[error("integrity violation: {0}")]
    Integrity(String),
}

impl DomainError {
    /// Helper for [`DomainError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Helper for [`DomainError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Helper for [`DomainError::Authorization`].
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    /// Helper for [`DomainError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Helper for [`DomainError::Upstream`].
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Helper for [`DomainError::Integrity`].
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity(message.into())
    }
}

/// Convenient result alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
