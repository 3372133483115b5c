//! HTTP error payloads and mapping from domain errors.
//!
//! Keep the domain free of transport concerns by translating
//! [`DomainError`] into Actix responses here. Server-side failures are
//! fully logged but redacted on the wire outside debug builds.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use tracing::error;

use crate::domain::DomainError;

/// Standard error envelope returned by HTTP handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError(DomainError);

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    /// The wrapped domain failure.
    pub fn domain_error(&self) -> &DomainError {
        &self.0
    }

    fn to_status_code(&self) -> StatusCode {
        match self.0 {
            DomainError::Validation(_) | DomainError::Conflict(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Authorization(_) => StatusCode::FORBIDDEN,
            DomainError::Upstream(_) => StatusCode::BAD_GATEWAY,
            DomainError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.to_status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self.0, "request failed server-side");
            if !cfg!(debug_assertions) {
                return HttpResponse::build(status).json(ErrorBody {
                    error: "internal server error",
                });
            }
        }
        HttpResponse::build(status).json(ErrorBody {
            error: &self.0.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_onto_statuses() {
        let cases = [
            (DomainError::validation("v"), StatusCode::BAD_REQUEST),
            (DomainError::conflict("c"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("n"), StatusCode::NOT_FOUND),
            (DomainError::authorization("a"), StatusCode::FORBIDDEN),
            (DomainError::upstream("u"), StatusCode::BAD_GATEWAY),
            (
                DomainError::integrity("i"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (domain_error, expected) in cases {
            assert_eq!(ApiError::from(domain_error).status_code(), expected);
        }
    }
}
