//! Shared fixtures for integration tests: a tempfile SQLite database with
//! the production schema, plus seed rows inserted through the gateway.

use std::sync::Arc;

use backend::outbound::persistence::{
    initialize_schema, Database, SqlValue, SqliteDatabase,
};
use chrono::Utc;
use tempfile::TempDir;

/// Open a fresh embedded database and run the schema bootstrap.
pub async fn fresh_database() -> (TempDir, Arc<dyn Database>) {
    let dir = TempDir::new().expect("temp dir");
    let db = SqliteDatabase::open(dir.path().join("test.db")).expect("open sqlite");
    let db: Arc<dyn Database> = Arc::new(db);
    initialize_schema(db.as_ref()).await;
    (dir, db)
}

/// Insert a user row, returning its id.
pub async fn seed_user(db: &dyn Database, email: &str, role: &str) -> i64 {
    db.insert(
        "INSERT INTO users (email, password_hash, name, role, created_at) \
         VALUES (?, ?, ?, ?, ?)",
        &[
            SqlValue::from(email),
            SqlValue::from("argon2id$stub"),
            SqlValue::from("Test User"),
            SqlValue::from(role),
            SqlValue::from(Utc::now().to_rfc3339()),
        ],
    )
    .await
    .expect("seed user")
}

/// Insert a course row owned by `teacher_id`, returning its id.
pub async fn seed_course(
    db: &dyn Database,
    teacher_id: i64,
    price: &str,
    content_urls: &[&str],
) -> i64 {
    let urls: Vec<String> = content_urls.iter().map(|u| (*u).to_owned()).collect();
    let encoded = serde_json::to_string(&urls).expect("encode urls");
    let now = Utc::now().to_rfc3339();
    db.insert(
        "INSERT INTO courses \
         (teacher_id, title, description, content_urls, price, thumbnail_url, \
          created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        &[
            SqlValue::Integer(teacher_id),
            SqlValue::from("Ownership in Depth"),
            SqlValue::from("Borrowing, lifetimes, and aliasing"),
            SqlValue::from(encoded),
            SqlValue::from(price),
            SqlValue::Null,
            SqlValue::from(now.clone()),
            SqlValue::from(now),
        ],
    )
    .await
    .expect("seed course")
}

/// Count enrollment rows for a pair in a given status.
pub async fn count_enrollments(
    db: &dyn Database,
    student_id: i64,
    course_id: i64,
    status: &str,
) -> usize {
    db.query(
        "SELECT id FROM enrollments \
         WHERE student_id = ? AND course_id = ? AND payment_status = ?",
        &[
            SqlValue::Integer(student_id),
            SqlValue::Integer(course_id),
            SqlValue::from(status),
        ],
    )
    .await
    .expect("count enrollments")
    .len()
}
