//! Trusted-identity extraction and the role gate.
//!
//! Credential verification terminates upstream; every inbound request
//! arrives with identity headers the upstream auth layer has already
//! vouched for. Missing or malformed headers are a 401; holding the wrong
//! role for a route is a 403 from [`require_student`].

use std::future::{ready, Ready};

use actix_web::error::ErrorUnauthorized;
use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::domain::{DomainError, Identity, Role};

use super::error::ApiError;

/// Header carrying the authenticated account id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated email.
pub const USER_EMAIL_HEADER: &str = "x-user-email";
/// Header carrying the authenticated role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor wrapping the trusted [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity(pub Identity);

fn header<'r>(req: &'r HttpRequest, name: &str) -> Result<&'r str, actix_web::Error> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ErrorUnauthorized(format!("missing identity header {name}")))
}

fn extract(req: &HttpRequest) -> Result<RequestIdentity, actix_web::Error> {
    let user_id = header(req, USER_ID_HEADER)?
        .parse::<i64>()
        .map_err(|_| ErrorUnauthorized("malformed identity header x-user-id"))?;
    let email = header(req, USER_EMAIL_HEADER)?.to_owned();
    let role = header(req, USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|_| ErrorUnauthorized("malformed identity header x-user-role"))?;
    Ok(RequestIdentity(Identity {
        user_id,
        email,
        role,
    }))
}

impl FromRequest for RequestIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract(req))
    }
}

/// Gate a route to students.
///
/// # Errors
///
/// [`ApiError`] carrying [`DomainError::Authorization`] (403) when the
/// requester is not a student.
pub fn require_student(identity: &Identity) -> Result<(), ApiError> {
    if identity.role == Role::Student {
        Ok(())
    } else {
        Err(DomainError::authorization("student role required").into())
    }
}
