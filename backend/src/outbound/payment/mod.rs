//! Outbound payment gateway adapters.

pub mod http_gateway;
pub mod webhook;

pub use self::http_gateway::HttpPaymentGateway;
pub use self::webhook::{WebhookVerifier, WebhookVerifyError, SIGNATURE_HEADER};
