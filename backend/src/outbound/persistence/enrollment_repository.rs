//! SQL-backed implementation of the `EnrollmentRepository` port.
//!
//! The transition is one conditional UPDATE guarded on `payment_status =
//! 'pending'`; that single statement is the atomic primitive that makes
//! duplicate and racing confirmation deliveries safe.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::ports::{EnrollmentRepository, NewEnrollment, RepositoryError};
use crate::domain::{Enrollment, EnrollmentStatus, TerminalStatus, TransitionKey};

use super::gateway::{Database, SqlRow, SqlValue};
use super::rows::{map_db_error, parse_timestamp};

const ENROLLMENT_COLUMNS: &str =
    "id, student_id, course_id, external_ref, payment_status, created_at";

/// Gateway-backed enrollment repository.
#[derive(Clone)]
pub struct SqlEnrollmentRepository {
    db: Arc<dyn Database>,
}

impl SqlEnrollmentRepository {
    /// Build the repository over a gateway handle.
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    async fn fetch_one(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<Enrollment>, RepositoryError> {
        let rows = self.db.query(sql, params).await.map_err(map_db_error)?;
        rows.first().map(row_to_enrollment).transpose()
    }
}

fn row_to_enrollment(row: &SqlRow) -> Result<Enrollment, RepositoryError> {
    let status_raw = row.require_text("payment_status").map_err(map_db_error)?;
    let status: EnrollmentStatus = status_raw
        .parse()
        .map_err(|e| RepositoryError::integrity(format!("column payment_status: {e}")))?;
    let created_raw = row.require_text("created_at").map_err(map_db_error)?;
    Ok(Enrollment {
        id: row.require_i64("id").map_err(map_db_error)?,
        student_id: row.require_i64("student_id").map_err(map_db_error)?,
        course_id: row.require_i64("course_id").map_err(map_db_error)?,
        external_ref: row
            .optional_text("external_ref")
            .map_err(map_db_error)?
            .map(str::to_owned),
        status,
        created_at: parse_timestamp("created_at", created_raw)?,
    })
}

#[async_trait]
impl EnrollmentRepository for SqlEnrollmentRepository {
    async fn create(&self, new: NewEnrollment) -> Result<Enrollment, RepositoryError> {
        let created_at = Utc::now();
        let id = self
            .db
            .insert(
                "INSERT INTO enrollments \
                 (student_id, course_id, external_ref, payment_status, created_at) \
                 VALUES (?, ?, ?, 'pending', ?)",
                &[
                    SqlValue::Integer(new.student_id),
                    SqlValue::Integer(new.course_id),
                    SqlValue::from(new.external_ref.clone()),
                    SqlValue::from(created_at.to_rfc3339()),
                ],
            )
            .await
            .map_err(map_db_error)?;
        Ok(Enrollment {
            id,
            student_id: new.student_id,
            course_id: new.course_id,
            external_ref: new.external_ref,
            status: EnrollmentStatus::Pending,
            created_at,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Enrollment>, RepositoryError> {
        self.fetch_one(
            &format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = ?"),
            &[SqlValue::Integer(id)],
        )
        .await
    }

    async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        self.fetch_one(
            &format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE external_ref = ?"),
            &[SqlValue::from(external_ref)],
        )
        .await
    }

    async fn has_completed(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<bool, RepositoryError> {
        let rows = self
            .db
            .query(
                "SELECT id FROM enrollments \
                 WHERE student_id = ? AND course_id = ? AND payment_status = 'completed' \
                 LIMIT 1",
                &[SqlValue::Integer(student_id), SqlValue::Integer(course_id)],
            )
            .await
            .map_err(map_db_error)?;
        Ok(!rows.is_empty())
    }

    async fn apply_transition(
        &self,
        key: &TransitionKey,
        target: TerminalStatus,
    ) -> Result<u64, RepositoryError> {
        let (filter, key_param) = match key {
            TransitionKey::Id(id) => ("id = ?", SqlValue::Integer(*id)),
            TransitionKey::ExternalRef(r) => ("external_ref = ?", SqlValue::from(r.as_str())),
        };
        self.db
            .execute(
                &format!(
                    "UPDATE enrollments SET payment_status = ? \
                     WHERE {filter} AND payment_status = 'pending'"
                ),
                &[SqlValue::from(target.as_status().as_str()), key_param],
            )
            .await
            .map_err(map_db_error)
    }
}
