//! Embedded SQLite gateway adapter.
//!
//! One `rusqlite` connection serializes every statement behind a mutex, and
//! each call hops onto the blocking pool so handler tasks never block the
//! runtime. Generated ids come from `last_insert_rowid()`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use super::gateway::{Database, DatabaseError, Dialect, SqlRow, SqlValue};

/// SQLite-backed [`Database`] implementation.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Open (creating if absent) the database file and enable foreign keys.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Connection`] when the file cannot be opened; callers
    /// treat this as fatal at startup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path)
            .map_err(|e| DatabaseError::connection(format!("open failed: {e}")))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| DatabaseError::connection(format!("foreign_keys pragma failed: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T, DatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| DatabaseError::connection("connection mutex poisoned"))?;
            job(&guard)
        })
        .await
        .map_err(|e| DatabaseError::query(format!("blocking task failed: {e}")))?
    }
}

fn bind_params(params: &[SqlValue]) -> Vec<rusqlite::types::Value> {
    params
        .iter()
        .map(|p| match p {
            SqlValue::Null => rusqlite::types::Value::Null,
            SqlValue::Integer(v) => rusqlite::types::Value::Integer(*v),
            SqlValue::Text(v) => rusqlite::types::Value::Text(v.clone()),
        })
        .collect()
}

fn decode_value(name: &str, value: ValueRef<'_>) -> Result<SqlValue, DatabaseError> {
    match value {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(v) => Ok(SqlValue::Integer(v)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| SqlValue::Text(s.to_owned()))
            .map_err(|e| DatabaseError::decode(format!("column {name}: invalid UTF-8: {e}"))),
        other => Err(DatabaseError::decode(format!(
            "column {name}: unsupported SQLite type {}",
            other.data_type()
        ))),
    }
}

fn map_sqlite_error(error: &rusqlite::Error) -> DatabaseError {
    if let rusqlite::Error::SqliteFailure(code, message) = error {
        let detail = message.clone().unwrap_or_else(|| code.to_string());
        return match code.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                DatabaseError::unique_violation(detail)
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                DatabaseError::foreign_key_violation(detail)
            }
            _ => DatabaseError::query(detail),
        };
    }
    DatabaseError::query(error.to_string())
}

fn run_query(
    conn: &Connection,
    sql: &str,
    params: &[rusqlite::types::Value],
) -> Result<Vec<SqlRow>, DatabaseError> {
    let mut stmt = conn.prepare(sql).map_err(|e| map_sqlite_error(&e))?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let mut rows = stmt
        .query(rusqlite::params_from_iter(params.iter()))
        .map_err(|e| map_sqlite_error(&e))?;
    let mut out = Vec::new();
    loop {
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => return Err(map_sqlite_error(&e)),
        };
        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            let value = row
                .get_ref(idx)
                .map_err(|e| map_sqlite_error(&e))
                .and_then(|v| decode_value(name, v))?;
            columns.push((name.clone(), value));
        }
        out.push(SqlRow::new(columns));
    }
    Ok(out)
}

#[async_trait]
impl Database for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DatabaseError> {
        let sql = sql.to_owned();
        let params = bind_params(params);
        self.run_blocking(move |conn| run_query(conn, &sql, &params))
            .await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError> {
        let sql = sql.to_owned();
        let params = bind_params(params);
        self.run_blocking(move |conn| {
            conn.execute(&sql, rusqlite::params_from_iter(params.iter()))
                .map(|n| n as u64)
                .map_err(|e| map_sqlite_error(&e))
        })
        .await
    }

    async fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<i64, DatabaseError> {
        let sql = sql.to_owned();
        let params = bind_params(params);
        self.run_blocking(move |conn| {
            conn.execute(&sql, rusqlite::params_from_iter(params.iter()))
                .map_err(|e| map_sqlite_error(&e))?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }
}
