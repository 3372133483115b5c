//! Payment API handlers: checkout initiation, the webhook push path, and
//! pull-path session verification.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{DomainError, PaymentReconciler};
use crate::outbound::payment::{WebhookVerifier, SIGNATURE_HEADER};

use super::error::ApiError;
use super::identity::{require_student, RequestIdentity};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCheckoutSessionRequest {
    course_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCheckoutSessionResponse {
    session_id: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct WebhookAck {
    received: bool,
}

#[derive(Debug, Serialize)]
struct VerifySessionResponse {
    success: bool,
    payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    course_id: Option<i64>,
}

/// Mint a checkout session for one course and record the bound pending
/// enrollment.
#[post("/payments/create-checkout-session")]
pub async fn create_checkout_session(
    identity: RequestIdentity,
    body: web::Json<CreateCheckoutSessionRequest>,
    reconciler: web::Data<PaymentReconciler>,
) -> Result<HttpResponse, ApiError> {
    require_student(&identity.0)?;
    let course_id = body
        .course_id
        .ok_or_else(|| DomainError::validation("courseId is required"))?;
    let session = reconciler.begin_checkout(&identity.0, course_id).await?;
    Ok(HttpResponse::Ok().json(CreateCheckoutSessionResponse {
        session_id: session.reference,
        url: session.url,
    }))
}

/// Receive a gateway confirmation event (push path).
///
/// The signature is verified over the raw body before anything is trusted.
/// Conditions that are not the sender's fault — an unmatched reference, an
/// event kind with no enrollment consequence — are acknowledged with 200 so
/// retry storms stop; only an unauthenticated delivery is rejected.
#[post("/payments/webhook")]
pub async fn webhook(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<WebhookVerifier>,
    reconciler: web::Data<PaymentReconciler>,
) -> Result<HttpResponse, ApiError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let event = verifier.verify_and_parse(&body, signature).map_err(|e| {
        warn!(error = %e, "webhook rejected");
        ApiError::from(DomainError::validation(format!("webhook error: {e}")))
    })?;

    reconciler.apply_event(&event).await?;
    Ok(HttpResponse::Ok().json(WebhookAck { received: true }))
}

/// Verify a checkout session against the gateway (pull path).
#[get("/payments/verify-session/{session_id}")]
pub async fn verify_session(
    _identity: RequestIdentity,
    path: web::Path<String>,
    reconciler: web::Data<PaymentReconciler>,
) -> Result<HttpResponse, ApiError> {
    let report = reconciler.verify_session(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(VerifySessionResponse {
        success: report.success,
        payment_status: report.payment_status,
        course_id: report.course_id,
    }))
}
