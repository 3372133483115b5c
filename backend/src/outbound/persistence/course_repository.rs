//! SQL-backed implementation of the `CourseRepository` port.
//!
//! The content-URI list column is decoded on every read path, single-row
//! and bulk alike; the encoded string never leaves this module.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{CourseRepository, RepositoryError};
use crate::domain::Course;

use super::gateway::{Database, SqlRow, SqlValue};
use super::rows::{decode_url_list, map_db_error, parse_price, parse_timestamp};

const COURSE_COLUMNS: &str =
    "id, teacher_id, title, description, content_urls, price, thumbnail_url, \
     created_at, updated_at";

/// Gateway-backed course repository.
#[derive(Clone)]
pub struct SqlCourseRepository {
    db: Arc<dyn Database>,
}

impl SqlCourseRepository {
    /// Build the repository over a gateway handle.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

fn row_to_course(row: &SqlRow) -> Result<Course, RepositoryError> {
    let content_urls = decode_url_list(row.require_text("content_urls").map_err(map_db_error)?)?;
    let price = parse_price(row.require_text("price").map_err(map_db_error)?)?;
    let created_raw = row.require_text("created_at").map_err(map_db_error)?;
    let updated_raw = row.require_text("updated_at").map_err(map_db_error)?;
    Ok(Course {
        id: row.require_i64("id").map_err(map_db_error)?,
        teacher_id: row.require_i64("teacher_id").map_err(map_db_error)?,
        title: row.require_text("title").map_err(map_db_error)?.to_owned(),
        description: row
            .require_text("description")
            .map_err(map_db_error)?
            .to_owned(),
        content_urls,
        price,
        thumbnail_url: row
            .optional_text("thumbnail_url")
            .map_err(map_db_error)?
            .map(str::to_owned),
        created_at: parse_timestamp("created_at", created_raw)?,
        updated_at: parse_timestamp("updated_at", updated_raw)?,
    })
}

#[async_trait]
impl CourseRepository for SqlCourseRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Course>, RepositoryError> {
        let rows = self
            .db
            .query(
                &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?"),
                &[SqlValue::Integer(id)],
            )
            .await
            .map_err(map_db_error)?;
        rows.first().map(row_to_course).transpose()
    }

    async fn list_enrolled(&self, student_id: i64) -> Result<Vec<Course>, RepositoryError> {
        let rows = self
            .db
            .query(
                "SELECT c.id, c.teacher_id, c.title, c.description, c.content_urls, \
                 c.price, c.thumbnail_url, c.created_at, c.updated_at \
                 FROM courses c \
                 JOIN enrollments e ON e.course_id = c.id \
                 WHERE e.student_id = ? AND e.payment_status = 'completed' \
                 ORDER BY e.created_at DESC",
                &[SqlValue::Integer(student_id)],
            )
            .await
            .map_err(map_db_error)?;
        rows.iter().map(row_to_course).collect()
    }
}
