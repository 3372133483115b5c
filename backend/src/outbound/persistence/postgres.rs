//! Networked PostgreSQL gateway adapter.
//!
//! Connections come from a bb8 pool checked out per call. Canonical `?`
//! placeholders are rewritten to `$1..$n` on the way in; generated ids come
//! back as a projected `RETURNING id` column.

use async_trait::async_trait;
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use bytes::BytesMut;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::{NoTls, Row};

use super::gateway::{numbered_placeholders, Database, DatabaseError, Dialect, SqlRow, SqlValue};

/// Pool sizing for the networked backend.
const POOL_MAX_SIZE: u32 = 10;

/// PostgreSQL-backed [`Database`] implementation.
#[derive(Clone)]
pub struct PostgresDatabase {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl PostgresDatabase {
    /// Build the pool from a connection string and verify connectivity with
    /// one round trip.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Connection`] when the URL is invalid, the pool
    /// cannot be built, or the ping fails; callers treat this as fatal at
    /// startup.
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        let manager = PostgresConnectionManager::new_from_stringlike(database_url, NoTls)
            .map_err(|e| DatabaseError::connection(format!("invalid database url: {e}")))?;
        let pool = Pool::builder()
            .max_size(POOL_MAX_SIZE)
            .build(manager)
            .await
            .map_err(|e| DatabaseError::connection(format!("pool build failed: {e}")))?;
        let db = Self { pool };
        db.query("SELECT 1 AS one", &[]).await?;
        Ok(db)
    }

    async fn checkout(
        &self,
    ) -> Result<bb8::PooledConnection<'_, PostgresConnectionManager<NoTls>>, DatabaseError> {
        self.pool
            .get()
            .await
            .map_err(|e| DatabaseError::connection(format!("pool checkout failed: {e}")))
    }
}

/// Adapter binding a canonical [`SqlValue`] into tokio-postgres parameters.
#[derive(Debug)]
struct PgParam<'a>(&'a SqlValue);

impl ToSql for PgParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Integer(v) => v.to_sql(ty, out),
            SqlValue::Text(v) => v.as_str().to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        <i64 as ToSql>::accepts(ty) || <&str as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

fn bind_params(params: &[SqlValue]) -> Vec<PgParam<'_>> {
    params.iter().map(PgParam).collect()
}

fn decode_row(row: &Row) -> Result<SqlRow, DatabaseError> {
    let mut columns = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name().to_owned();
        let value = match *column.type_() {
            Type::INT8 => row
                .try_get::<_, Option<i64>>(idx)
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Integer)),
            Type::INT4 => row
                .try_get::<_, Option<i32>>(idx)
                .map(|v| v.map_or(SqlValue::Null, |n| SqlValue::Integer(n.into()))),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => row
                .try_get::<_, Option<String>>(idx)
                .map(|v| v.map_or(SqlValue::Null, SqlValue::Text)),
            ref other => {
                return Err(DatabaseError::decode(format!(
                    "column {name}: unsupported PostgreSQL type {other}"
                )))
            }
        }
        .map_err(|e| DatabaseError::decode(format!("column {name}: {e}")))?;
        columns.push((name, value));
    }
    Ok(SqlRow::new(columns))
}

fn map_postgres_error(error: &tokio_postgres::Error) -> DatabaseError {
    if let Some(db_error) = error.as_db_error() {
        let detail = db_error.message().to_owned();
        return match *db_error.code() {
            SqlState::UNIQUE_VIOLATION => DatabaseError::unique_violation(detail),
            SqlState::FOREIGN_KEY_VIOLATION => DatabaseError::foreign_key_violation(detail),
            _ => DatabaseError::query(detail),
        };
    }
    if error.is_closed() {
        DatabaseError::connection(error.to_string())
    } else {
        DatabaseError::query(error.to_string())
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DatabaseError> {
        let conn = self.checkout().await?;
        let sql = numbered_placeholders(sql);
        let bound = bind_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> =
            bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = conn
            .query(sql.as_str(), &refs)
            .await
            .map_err(|e| map_postgres_error(&e))?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DatabaseError> {
        let conn = self.checkout().await?;
        let sql = numbered_placeholders(sql);
        let bound = bind_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> =
            bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        conn.execute(sql.as_str(), &refs)
            .await
            .map_err(|e| map_postgres_error(&e))
    }

    async fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<i64, DatabaseError> {
        let conn = self.checkout().await?;
        let sql = format!("{} RETURNING id", numbered_placeholders(sql));
        let bound = bind_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> =
            bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let row = conn
            .query_one(sql.as_str(), &refs)
            .await
            .map_err(|e| map_postgres_error(&e))?;
        row.try_get::<_, i64>(0)
            .map_err(|e| DatabaseError::decode(format!("generated id: {e}")))
    }
}
