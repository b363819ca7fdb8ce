//! bearer token authentication of webhook calls
use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::{error::HttpError, settings::AuthToken};

const BEARER_PREFIX: &str = "Bearer ";

/// raw `Authorization` header, empty when absent or not valid utf-8
fn authorization_header(headers: &HeaderMap) -> &str {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// checks the bearer token of the `Authorization` header against `expected`
pub fn authenticate(header: &str, expected: &AuthToken) -> Result<(), HttpError> {
    if !header.starts_with(BEARER_PREFIX) {
        return Err(HttpError::authentication_required());
    }

    match header.split_whitespace().nth(1) {
        Some(token) if token.as_bytes() == expected.as_str().as_bytes() => Ok(()),
        _ => Err(HttpError::bad_credentials()),
    }
}

pub fn authenticate_headers(headers: &HeaderMap, expected: &AuthToken) -> Result<(), HttpError> {
    authenticate(authorization_header(headers), expected)
}
