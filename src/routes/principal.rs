//! The caller identity extractor (SPEC_FULL.md §4.F).
//!
//! Authentication happens upstream (spec.md §1 Non-goals); this extractor
//! only trusts the two headers an upstream proxy is expected to inject.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

const PRINCIPAL_HEADER: &str = "x-kamino-principal";
const ADMIN_HEADER: &str = "x-kamino-admin";

/// The calling user, as asserted by an upstream authenticating proxy.
#[derive(Debug, Clone)]
pub struct Principal {
    pub name: String,
    pub is_admin: bool,
}

/// Rejection returned when the upstream proxy didn't inject `X-Kamino-Principal`.
#[derive(Debug)]
pub struct MissingPrincipal;

impl IntoResponse for MissingPrincipal {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "missing X-Kamino-Principal header").into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = MissingPrincipal;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or(MissingPrincipal)?;
        let is_admin = parts
            .headers
            .get(ADMIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        Ok(Principal { name, is_admin })
    }
}
