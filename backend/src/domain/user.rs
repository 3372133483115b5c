//! User identity and role types.
//!
//! Credential issuance and verification live upstream; the domain only ever
//! sees an already-authenticated identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Marketplace role attached to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns and publishes courses.
    Teacher,
    /// Purchases and consumes courses.
    Student,
}

impl Role {
    /// Canonical storage spelling of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised role string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(Self::Teacher),
            "student" => Ok(Self::Student),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}

/// The authenticated identity attached to every inbound request.
///
/// Produced by the upstream auth layer; the domain trusts it without
/// re-verifying credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Account id of the requester.
    pub user_id: i64,
    /// Email of the requester, forwarded into checkout metadata.
    pub email: String,
    /// Role of the requester.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_storage_spelling() {
        for role in [Role::Teacher, Role::Student] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(
            "admin".parse::<Role>(),
            Err(RoleParseError("admin".to_owned()))
        );
    }
}
