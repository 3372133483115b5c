//! Uniform parameterized-query surface over the two storage engines.
//!
//! Repositories speak one canonical SQL flavour: `?` placeholders and a
//! small scalar parameter set. Each adapter translates at this boundary —
//! the PostgreSQL adapter rewrites placeholders to `$1..$n` and reads
//! generated ids from a projected `RETURNING` column, the SQLite adapter
//! binds `?` natively and reads `last_insert_rowid()`. Values never travel
//! through query text; interpolation is not offered by this interface.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Which engine an adapter drives. Selected once at startup from explicit
/// configuration, never by conditional module loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Embedded engine; one serialized connection.
    Sqlite,
    /// Networked engine; pooled connections.
    Postgres,
}

/// Scalar parameter accepted by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// 64-bit integer.
    Integer(i64),
    /// UTF-8 text.
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

/// Errors surfaced by gateway adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    /// Engine unreachable, pool exhausted, or file unopenable. Fatal when
    /// raised during startup.
    #[error("database connection failed: {message}")]
    Connection {
        /// Adapter-level detail.
        message: String,
    },
    /// Statement failed for a reason other than a constraint.
    #[error("database query failed: {message}")]
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
    /// A foreign key rejected the write.
    #[error("foreign key violated: {message}")]
    ForeignKeyViolation {
        /// Adapter-level detail.
        message: String,
    },
    /// A fetched column was missing or carried an unexpected type.
    #[error("column decode failed: {message}")]
    Decode {
        /// Adapter-level detail.
        message: String,
    },
}

impl DatabaseError {
    /// Helper for connection failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for statement failures.
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

    /// Helper for decode failures.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// One fetched row: column names paired with decoded scalar values.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    /// Build a row from (name, value) pairs in projection order.
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    fn find(&self, name: &str) -> Result<&SqlValue, DatabaseError> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, value)| value)
            .ok_or_else(|| DatabaseError::decode(format!("missing column {name}")))
    }

    /// Required integer column.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Decode`] when the column is absent, NULL, or not an
    /// integer.
    pub fn require_i64(&self, name: &str) -> Result<i64, DatabaseError> {
        match self.find(name)? {
            SqlValue::Integer(v) => Ok(*v),
            other => Err(DatabaseError::decode(format!(
                "column {name}: expected integer, got {other}"
            ))),
        }
    }

    /// Required text column.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Decode`] when the column is absent, NULL, or not
    /// text.
    pub fn require_text(&self, name: &str) -> Result<&str, DatabaseError> {
        match self.find(name)? {
            SqlValue::Text(v) => Ok(v.as_str()),
            other => Err(DatabaseError::decode(format!(
                "column {name}: expected text, got {other}"
            ))),
        }
    }

    /// Nullable text column.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Decode`] when the column is absent or neither NULL
    /// nor text.
    pub fn optional_text(&self, name: &str) -> Result<Option<&str>, DatabaseError> {
        match self.find(name)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(v) => Ok(Some(v.as_str())),
            other => Err(DatabaseError::decode(format!(
                "column {name}: expected text or NULL, got {other}"
            ))),
        }
    }
}

/// The persistence gateway: one logical operation set regardless of engine.
#[async_trait]
pub trait Database: Send + Sync {
    /// Which engine this adapter drives.
    fn dialect(&self) -> Dialect;

    /// Run a row-returning statement.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DatabaseError>;

    /// Run a non-returning statement; yields the affected-row count.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError>;

    /// Run an INSERT and yield the generated primary key, however the
    /// engine exposes it.
    async fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<i64, DatabaseError>;
}

/// Rewrite canonical `?` placeholders to PostgreSQL `$1..$n`.
///
/// Repositories own every query string and never embed a literal `?`, so a
/// plain scan is sufficient.
pub(crate) fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0u32;
    for ch in sql.chars() {
        if ch == '?' {
            n += 1;
            out.push('$');
            out.push_str(&n.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_left_to_right() {
        assert_eq!(
            numbered_placeholders("SELECT * FROM t WHERE a = ? AND b = ? OR c = ?"),
            "SELECT * FROM t WHERE a = $1 AND b = $2 OR c = $3"
        );
    }

    #[test]
    fn statements_without_placeholders_pass_through() {
        assert_eq!(numbered_placeholders("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn row_accessors_enforce_types() {
        let row = SqlRow::new(vec![
            ("id".to_owned(), SqlValue::Integer(7)),
            ("title".to_owned(), SqlValue::Text("Rust".to_owned())),
            ("thumbnail_url".to_owned(), SqlValue::Null),
        ]);
        assert_eq!(row.require_i64("id").unwrap(), 7);
        assert_eq!(row.require_text("title").unwrap(), "Rust");
        assert_eq!(row.optional_text("thumbnail_url").unwrap(), None);
        assert!(row.require_text("id").is_err());
        assert!(row.require_i64("missing").is_err());
    }
}
