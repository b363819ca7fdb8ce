//! the alertmanager webhook endpoint
//!
//! Every `POST`, whatever its path, runs through [`receive_alert`]: authenticate, read
//! the body, validate it and log the alert. Rejections are turned into a response and an
//! error record in one place. [`log_access`] wraps the whole router so every answered
//! request ends up in the access log.
use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::Value;

use crate::{
    alert,
    auth::authenticate_headers,
    error::{text_response, HttpError},
    log::{Access, Logger},
    settings::AuthToken,
    telemetry_endpoint::Metrics,
};

/// everything a request needs, built once at startup
pub struct ReceiverState {
    token: AuthToken,
    logger: Logger,
    metrics: Metrics,
}

impl ReceiverState {
    pub fn new(token: AuthToken, logger: Logger, metrics: Metrics) -> Self {
        Self {
            token,
            logger,
            metrics,
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

pub fn router(state: Arc<ReceiverState>) -> Router {
    Router::new()
        .route("/", post(receive_alert))
        .route("/*path", post(receive_alert))
        .layer(middleware::from_fn_with_state(state.clone(), log_access))
        .with_state(state)
}

async fn receive_alert(State(state): State<Arc<ReceiverState>>, request: Request) -> Response {
    match process_alert(&state, request).await {
        Ok(()) => text_response(StatusCode::OK, "OK".into()),
        Err(err) => {
            state.logger.error(err.code.as_u16(), &err.message);
            state.metrics.request_rejected(err.code);
            err.into_response()
        }
    }
}

async fn process_alert(state: &ReceiverState, request: Request) -> Result<(), HttpError> {
    let (parts, body) = request.into_parts();

    // nothing of the body is read before the caller is authenticated
    authenticate_headers(&parts.headers, &state.token)?;

    let length = content_length(&parts.headers)?;
    let body = axum::body::to_bytes(body, length).await.map_err(|err| {
        tracing::debug!("failed to read alert body: {}", err);
        HttpError::bad_payload()
    })?;

    let alert = alert::decode(&body)?;

    state.logger.alert(&alert);
    if let Some(status) = alert.get("status").and_then(Value::as_str) {
        state.metrics.alert_received(status);
    }

    Ok(())
}

/// declared body length, absent, unparseable and zero all mean there is no payload
fn content_length(headers: &HeaderMap) -> Result<usize, HttpError> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|length| *length > 0)
        .ok_or_else(HttpError::no_alert_payload)
}

async fn log_access(
    State(state): State<Arc<ReceiverState>>,
    request: Request,
    next: Next,
) -> Response {
    let client_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".into());
    let request_method = request.method().to_string();
    let request_path = request
        .uri()
        .path_and_query()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let protocol_version = format!("{:?}", request.version());

    let response = next.run(request).await;

    state.logger.request(&Access {
        client_address,
        request_method,
        request_path,
        protocol_version,
        response_code: response.status().as_u16(),
    });

    response
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn content_length_must_be_a_positive_integer() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), Err(HttpError::no_alert_payload()));

        for value in ["0", "abc", "-3", ""] {
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static(value));
            assert_eq!(
                content_length(&headers),
                Err(HttpError::no_alert_payload()),
                "{}",
                value
            );
        }

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(content_length(&headers), Ok(42));
    }
}
