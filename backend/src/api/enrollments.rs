//! Enrollment API handlers: purchase recording, the access-gate check, and
//! the student's purchased-course list.

use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::domain::ports::CourseRepository;
use crate::domain::{
    Course, DomainError, Enrollment, EnrollmentEngine, PaymentReconciler,
};

use super::error::ApiError;
use super::identity::{require_student, RequestIdentity};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseRequest {
    course_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct PurchaseResponse {
    message: &'static str,
    enrollment: Enrollment,
}

#[derive(Debug, Serialize)]
struct CheckResponse {
    enrolled: bool,
    course_id: i64,
}

#[derive(Debug, Serialize)]
struct MyCoursesResponse {
    enrollments: Vec<Course>,
    total: usize,
}

/// Record a purchase intent without minting a checkout session.
#[post("/enrollments/purchase")]
pub async fn purchase(
    identity: RequestIdentity,
    body: web::Json<PurchaseRequest>,
    reconciler: web::Data<PaymentReconciler>,
) -> Result<HttpResponse, ApiError> {
    require_student(&identity.0)?;
    let course_id = body
        .course_id
        .ok_or_else(|| DomainError::validation("courseId is required"))?;
    let enrollment = reconciler.record_purchase(&identity.0, course_id).await?;
    Ok(HttpResponse::Created().json(PurchaseResponse {
        message: "Enrollment created. Complete payment to access the course.",
        enrollment,
    }))
}

/// Whether the requester holds a completed enrollment for the course. Gates
/// content access and duplicate purchase attempts alike.
#[get("/enrollments/check/{course_id}")]
pub async fn check(
    identity: RequestIdentity,
    path: web::Path<i64>,
    engine: web::Data<EnrollmentEngine>,
) -> Result<HttpResponse, ApiError> {
    require_student(&identity.0)?;
    let course_id = path.into_inner();
    let enrolled = engine.check_completed(identity.0.user_id, course_id).await?;
    Ok(HttpResponse::Ok().json(CheckResponse {
        enrolled,
        course_id,
    }))
}

/// Courses the requester has completed purchases for.
#[get("/enrollments/my-courses")]
pub async fn my_courses(
    identity: RequestIdentity,
    courses: web::Data<dyn CourseRepository>,
) -> Result<HttpResponse, ApiError> {
    require_student(&identity.0)?;
    let enrolled = courses
        .list_enrolled(identity.0.user_id)
        .await
        .map_err(DomainError::from)?;
    Ok(HttpResponse::Ok().json(MyCoursesResponse {
        total: enrolled.len(),
        enrollments: enrolled,
    }))
}
