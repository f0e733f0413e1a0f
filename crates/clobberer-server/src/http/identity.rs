//! Requester extraction from the trusted identity header.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, HeaderName};
use axum::http::request::Parts;

use super::AppState;
use crate::engine::Requester;

fn requester_from_headers(headers: &HeaderMap, identity_header: &HeaderName) -> Requester {
    Requester::from_identity(headers.get(identity_header).and_then(|v| v.to_str().ok()))
}

impl FromRequestParts<AppState> for Requester {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(requester_from_headers(&parts.headers, &state.identity_header))
    }
}
