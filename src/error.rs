//! rejections of a webhook request
use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// carries the status code and the plain text body sent back to the caller
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HttpError {
    pub message: String,
    pub code: StatusCode,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: StatusCode) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    pub fn authentication_required() -> Self {
        Self::new("Authentication required", StatusCode::UNAUTHORIZED)
    }

    pub fn bad_credentials() -> Self {
        Self::new("Bad credentials", StatusCode::UNAUTHORIZED)
    }

    pub fn no_alert_payload() -> Self {
        Self::new("No alert payload", StatusCode::BAD_REQUEST)
    }

    pub fn bad_payload() -> Self {
        Self::new("Bad payload", StatusCode::BAD_REQUEST)
    }

    /// `payload` is the re-serialized json of the rejected body
    pub fn not_a_valid_alert(payload: &str) -> Self {
        Self::new(
            format!("Not a valid alert: {}", payload),
            StatusCode::BAD_REQUEST,
        )
    }
}

/// html content type for every answer, same as the OK response
pub fn text_response(code: StatusCode, body: String) -> Response {
    (code, [(CONTENT_TYPE, "text/html")], body).into_response()
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        text_response(self.code, self.message)
    }
}
