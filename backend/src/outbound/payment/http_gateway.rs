//! Reqwest-backed payment gateway adapter.
//!
//! This adapter owns transport details only: form serialisation of the
//! session mint, timeout and HTTP error mapping, and JSON decoding into the
//! port types. The wire shape follows the Stripe Checkout API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::domain::ports::{
    CheckoutRequest, CheckoutSession, PaymentGateway, PaymentGatewayError, SessionView,
};

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 15;

/// HTTP adapter for the external payment processor.
pub struct HttpPaymentGateway {
    client: Client,
    base_url: Url,
    secret_key: String,
}

impl HttpPaymentGateway {
    /// Build an adapter with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, secret_key: String) -> Result<Self, reqwest::Error> {
        Self::with_timeout(
            base_url,
            secret_key,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        )
    }

    /// Build an adapter with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        base_url: Url,
        secret_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            secret_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentGatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| PaymentGatewayError::decode(format!("bad endpoint {path}: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct SessionDto {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

fn map_transport_error(error: &reqwest::Error) -> PaymentGatewayError {
    if error.is_timeout() {
        PaymentGatewayError::Timeout
    } else {
        PaymentGatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &str) -> PaymentGatewayError {
    // Gateway error bodies can carry account identifiers; keep only a prefix.
    let message: String = body.chars().take(200).collect();
    PaymentGatewayError::Rejected {
        status: status.as_u16(),
        message,
    }
}

async fn decode_session(response: reqwest::Response) -> Result<SessionDto, PaymentGatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| map_transport_error(&e))?;
    if !status.is_success() {
        return Err(map_status_error(status, &body));
    }
    serde_json::from_str(&body)
        .map_err(|e| PaymentGatewayError::decode(format!("invalid session payload: {e}")))
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentGatewayError> {
        let endpoint = self.endpoint("v1/checkout/sessions")?;
        let amount = request.amount_minor.to_string();
        let course_id = request.course_id.to_string();
        let student_id = request.student_id.to_string();
        let mut form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("payment_method_types[0]", "card"),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", &request.currency),
            ("line_items[0][price_data][unit_amount]", &amount),
            (
                "line_items[0][price_data][product_data][name]",
                &request.description,
            ),
            ("success_url", &request.success_url),
            ("cancel_url", &request.cancel_url),
            ("metadata[courseId]", &course_id),
            ("metadata[studentId]", &student_id),
            ("metadata[studentEmail]", &request.student_email),
        ];
        if let Some(thumbnail) = request.thumbnail_url.as_deref() {
            form.push((
                "line_items[0][price_data][product_data][images][0]",
                thumbnail,
            ));
        }

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;
        let dto = decode_session(response).await?;
        let url = dto.url.ok_or_else(|| {
            PaymentGatewayError::decode("minted session carries no checkout url")
        })?;
        Ok(CheckoutSession {
            reference: dto.id,
            url,
        })
    }

    async fn retrieve_session(
        &self,
        reference: &str,
    ) -> Result<SessionView, PaymentGatewayError> {
        let endpoint = self.endpoint(&format!("v1/checkout/sessions/{reference}"))?;
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;
        let dto = decode_session(response).await?;
        let payment_status = dto.payment_status.unwrap_or_else(|| "unknown".to_owned());
        let course_id = dto
            .metadata
            .get("courseId")
            .and_then(|raw| raw.parse::<i64>().ok());
        Ok(SessionView {
            reference: dto.id,
            paid: payment_status == "paid",
            payment_status,
            course_id,
        })
    }
}
