//! Inbound HTTP adapters.

pub mod enrollments;
pub mod error;
pub mod health;
pub mod identity;
pub mod payments;

pub use self::error::ApiError;
pub use self::identity::RequestIdentity;
