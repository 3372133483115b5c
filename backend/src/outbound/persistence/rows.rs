//! Row-to-domain decoding shared by the SQL repositories.
//!
//! The serialized forms living in text columns — the JSON-encoded content
//! URI list, decimal price strings, RFC 3339 timestamps — are decoded here
//! and nowhere else. A malformed stored value is an integrity error, never
//! silently dropped.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::ports::RepositoryError;

use super::gateway::DatabaseError;

/// Map gateway errors onto the repository port taxonomy.
pub(super) fn map_db_error(error: DatabaseError) -> RepositoryError {
    match error {
        DatabaseError::Connection { message } => RepositoryError::connection(message),
        DatabaseError::Query { message } => RepositoryError::query(message),
        DatabaseError::UniqueViolation { message } => RepositoryError::unique_violation(message),
        DatabaseError::ForeignKeyViolation { message } => {
            RepositoryError::foreign_key_violation(message)
        }
        DatabaseError::Decode { message } => RepositoryError::integrity(message),
    }
}

/// Decode a stored RFC 3339 timestamp.
pub(super) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::integrity(format!("column {column}: bad timestamp: {e}")))
}

/// Decode a stored decimal price string.
pub(super) fn parse_price(raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|e| RepositoryError::integrity(format!("column price: bad decimal: {e}")))
}

/// Encode the ordered content-URI sequence for its text column.
pub(super) fn encode_url_list(urls: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(urls)
        .map_err(|e| RepositoryError::integrity(format!("content_urls encode failed: {e}")))
}

/// Decode the ordered content-URI sequence from its text column.
pub(super) fn decode_url_list(raw: &str) -> Result<Vec<String>, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|e| RepositoryError::integrity(format!("column content_urls: bad JSON: {e}")))
}
