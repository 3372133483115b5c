//! Webhook signature verification and event parsing.
//!
//! Inbound notifications carry a `t=<unix>,v1=<hex>` signature header; the
//! signature is HMAC-SHA256 over `"{t}.{body}"` with the shared endpoint
//! secret. Verification happens before the payload is trusted in any way,
//! uses a constant-time comparison, and bounds the timestamp skew to blunt
//! replay. Only a verified payload is parsed into a [`ConfirmationEvent`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::domain::{ConfirmationEvent, ConfirmationKind};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_TOLERANCE_SECONDS: u64 = 300;

/// Signature header name sent by the gateway.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Failures raised while authenticating a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookVerifyError {
    /// The signature header is absent or not `t=...,v1=...` shaped.
    #[error("malformed signature header")]
    MalformedHeader,
    /// The timestamp component is not an integer.
    #[error("malformed signature timestamp")]
    MalformedTimestamp,
    /// The delivery is older (or newer) than the allowed skew.
    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,
    /// The computed digest does not match the presented one.
    #[error("signature mismatch")]
    SignatureMismatch,
    /// The verified payload is not a well-formed event.
    #[error("malformed event payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Deserialize)]
struct EventDto {
    #[serde(rename = "type")]
    kind: String,
    data: EventDataDto,
}

#[derive(Debug, Deserialize)]
struct EventDataDto {
    object: EventObjectDto,
}

#[derive(Debug, Deserialize)]
struct EventObjectDto {
    id: String,
}

/// Verifies webhook deliveries against the shared endpoint secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

impl WebhookVerifier {
    /// Build a verifier with the default timestamp tolerance.
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            tolerance: Duration::from_secs(DEFAULT_TOLERANCE_SECONDS),
        }
    }

    /// Override the timestamp tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Verify `signature_header` against `body` and parse the event.
    ///
    /// # Errors
    ///
    /// Any [`WebhookVerifyError`]; callers must reject the delivery and
    /// change no state.
    pub fn verify_and_parse(
        &self,
        body: &[u8],
        signature_header: &str,
    ) -> Result<ConfirmationEvent, WebhookVerifyError> {
        self.verify_and_parse_at(body, signature_header, unix_now())
    }

    fn verify_and_parse_at(
        &self,
        body: &[u8],
        signature_header: &str,
        now: u64,
    ) -> Result<ConfirmationEvent, WebhookVerifyError> {
        let (timestamp_raw, signature_hex) = split_header(signature_header)?;
        let timestamp: u64 = timestamp_raw
            .parse()
            .map_err(|_| WebhookVerifyError::MalformedTimestamp)?;
        let skew = now.abs_diff(timestamp);
        if skew > self.tolerance.as_secs() {
            return Err(WebhookVerifyError::StaleTimestamp);
        }

        let signature =
            hex::decode(signature_hex).map_err(|_| WebhookVerifyError::MalformedHeader)?;
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| WebhookVerifyError::SignatureMismatch)?;
        mac.update(timestamp_raw.as_bytes());
        mac.update(b".");
        mac.update(body);
        // verify_slice is a constant-time comparison.
        mac.verify_slice(&signature)
            .map_err(|_| WebhookVerifyError::SignatureMismatch)?;

        parse_event(body)
    }

    /// Produce a valid signature header for `body` at the current time.
    /// Test-support for exercising the push path end to end.
    pub fn sign(&self, body: &[u8]) -> String {
        self.sign_at(body, unix_now())
    }

    fn sign_at(&self, body: &[u8], timestamp: u64) -> String {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        format!(
            "t={timestamp},v1={}",
            hex::encode(mac.finalize().into_bytes())
        )
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn split_header(header: &str) -> Result<(&str, &str), WebhookVerifyError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }
    match (timestamp, signature) {
        (Some(t), Some(v1)) => Ok((t, v1)),
        _ => Err(WebhookVerifyError::MalformedHeader),
    }
}

fn parse_event(body: &[u8]) -> Result<ConfirmationEvent, WebhookVerifyError> {
    let dto: EventDto = serde_json::from_slice(body)
        .map_err(|e| WebhookVerifyError::MalformedPayload(e.to_string()))?;
    let kind = match dto.kind.as_str() {
        "checkout.session.completed" => ConfirmationKind::SessionCompleted,
        "checkout.session.expired" => ConfirmationKind::SessionExpired,
        "payment_intent.payment_failed" => ConfirmationKind::PaymentFailed,
        other => ConfirmationKind::Other(other.to_owned()),
    };
    Ok(ConfirmationEvent {
        kind,
        reference: dto.data.object.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn body(kind: &str) -> Vec<u8> {
        format!(
            r#"{{"type":"{kind}","data":{{"object":{{"id":"cs_test_123"}}}}}}"#
        )
        .into_bytes()
    }

    #[test]
    fn valid_signature_yields_parsed_event() {
        let verifier = WebhookVerifier::new(SECRET.to_owned());
        let payload = body("checkout.session.completed");
        let header = verifier.sign_at(&payload, 1_700_000_000);

        let event = verifier
            .verify_and_parse_at(&payload, &header, 1_700_000_010)
            .expect("verification succeeds");
        assert_eq!(event.kind, ConfirmationKind::SessionCompleted);
        assert_eq!(event.reference, "cs_test_123");
    }

    #[test]
    fn tampered_body_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET.to_owned());
        let payload = body("checkout.session.completed");
        let header = verifier.sign_at(&payload, 1_700_000_000);

        let tampered = body("checkout.session.expired");
        let err = verifier
            .verify_and_parse_at(&tampered, &header, 1_700_000_010)
            .unwrap_err();
        assert_eq!(err, WebhookVerifyError::SignatureMismatch);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET.to_owned());
        let payload = body("checkout.session.completed");
        let header = WebhookVerifier::new("whsec_other".to_owned()).sign_at(&payload, 1_700_000_000);

        let err = verifier
            .verify_and_parse_at(&payload, &header, 1_700_000_010)
            .unwrap_err();
        assert_eq!(err, WebhookVerifyError::SignatureMismatch);
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET.to_owned());
        let payload = body("checkout.session.completed");
        let header = verifier.sign_at(&payload, 1_700_000_000);

        let err = verifier
            .verify_and_parse_at(&payload, &header, 1_700_000_000 + 301)
            .unwrap_err();
        assert_eq!(err, WebhookVerifyError::StaleTimestamp);
    }

    #[test]
    fn malformed_header_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET.to_owned());
        let err = verifier
            .verify_and_parse_at(&body("x"), "v1=deadbeef", 1_700_000_000)
            .unwrap_err();
        assert_eq!(err, WebhookVerifyError::MalformedHeader);
    }

    #[test]
    fn failure_and_expiry_kinds_parse() {
        let verifier = WebhookVerifier::new(SECRET.to_owned());
        for (kind, expected) in [
            (
                "checkout.session.expired",
                ConfirmationKind::SessionExpired,
            ),
            (
                "payment_intent.payment_failed",
                ConfirmationKind::PaymentFailed,
            ),
            (
                "invoice.created",
                ConfirmationKind::Other("invoice.created".to_owned()),
            ),
        ] {
            let payload = body(kind);
            let header = verifier.sign_at(&payload, 42);
            let event = verifier
                .verify_and_parse_at(&payload, &header, 42)
                .expect("verification succeeds");
            assert_eq!(event.kind, expected);
        }
    }
}
