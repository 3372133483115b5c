//! Idempotent schema bootstrap, parameterized by dialect.
//!
//! One statement set serves both engines; only the generated-id column and
//! the integer column type differ. Statement-level failures are logged and
//! skipped so a partially provisioned database still reports every problem
//! in one startup pass; engine connectivity failures are surfaced by the
//! adapter constructors before this code runs.

use tracing::{error, info};

use super::gateway::{Database, Dialect};

impl Dialect {
    fn generated_id(self) -> &'static str {
        match self {
            Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Self::Postgres => "BIGSERIAL PRIMARY KEY",
        }
    }

    fn integer(self) -> &'static str {
        match self {
            Self::Sqlite => "INTEGER",
            Self::Postgres => "BIGINT",
        }
    }
}

/// Create-if-absent DDL for the three tables, in dependency order.
pub fn schema_statements(dialect: Dialect) -> Vec<String> {
    let id = dialect.generated_id();
    let int = dialect.integer();
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS users (\n\
             id {id},\n\
             email TEXT UNIQUE NOT NULL,\n\
             password_hash TEXT NOT NULL,\n\
             name TEXT NOT NULL,\n\
             role TEXT NOT NULL CHECK(role IN ('teacher', 'student')),\n\
             created_at TEXT NOT NULL\n\
             )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS courses (\n\
             id {id},\n\
             teacher_id {int} NOT NULL REFERENCES users(id) ON DELETE CASCADE,\n\
             title TEXT NOT NULL,\n\
             description TEXT NOT NULL,\n\
             content_urls TEXT NOT NULL,\n\
             price TEXT NOT NULL,\n\
             thumbnail_url TEXT,\n\
             created_at TEXT NOT NULL,\n\
             updated_at TEXT NOT NULL\n\
             )"
        ),
        // No UNIQUE(student_id, course_id): retries legitimately stack
        // multiple pending and failed rows per pair. The single-completed
        // invariant is enforced by the application-level check.
        format!(
            "CREATE TABLE IF NOT EXISTS enrollments (\n\
             id {id},\n\
             student_id {int} NOT NULL REFERENCES users(id) ON DELETE CASCADE,\n\
             course_id {int} NOT NULL REFERENCES courses(id) ON DELETE CASCADE,\n\
             payment_status TEXT NOT NULL DEFAULT 'pending' \
             CHECK(payment_status IN ('pending', 'completed', 'failed')),\n\
             external_ref TEXT UNIQUE,\n\
             created_at TEXT NOT NULL\n\
             )"
        ),
    ]
}

/// Run every schema statement, logging per-statement failures.
pub async fn initialize_schema(db: &dyn Database) {
    for statement in schema_statements(db.dialect()) {
        match db.execute(&statement, &[]).await {
            Ok(_) => {}
            Err(e) => error!(error = %e, "schema statement failed"),
        }
    }
    info!(dialect = ?db.dialect(), "schema bootstrap complete");
}
