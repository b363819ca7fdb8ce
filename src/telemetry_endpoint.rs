//! Here we expose prometheus metrics about received webhooks
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{opts, Encoder, IntCounterVec, Registry, TextEncoder, TEXT_FORMAT};
use tokio::net::TcpListener;

/// counters of one receiver, registered in their own registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    received_alerts: IntCounterVec,
    rejected_requests: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let received_alerts = IntCounterVec::new(
            opts!("received_alerts", "total number of logged alert notifications")
                .namespace("alert_logger")
                .subsystem("webhook"),
            &["status"],
        )?;
        let rejected_requests = IntCounterVec::new(
            opts!("rejected_requests", "total number of rejected webhook calls")
                .namespace("alert_logger")
                .subsystem("webhook"),
            &["code"],
        )?;

        registry.register(Box::new(received_alerts.clone()))?;
        registry.register(Box::new(rejected_requests.clone()))?;

        Ok(Self {
            registry,
            received_alerts,
            rejected_requests,
        })
    }

    pub fn alert_received(&self, status: &str) {
        self.received_alerts.with_label_values(&[status]).inc();
    }

    pub fn request_rejected(&self, code: StatusCode) {
        self.rejected_requests
            .with_label_values(&[code.as_str()])
            .inc();
    }

    /// text exposition format of all counters
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

async fn metrics_handler(State(metrics): State<Metrics>) -> Response {
    match metrics.encode() {
        Ok(buffer) => ([(CONTENT_TYPE, TEXT_FORMAT)], buffer).into_response(),
        Err(err) => {
            tracing::warn!("failed to encode metrics: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn router(metrics: Metrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

pub async fn run_telemetry_endpoint(listener: TcpListener, metrics: Metrics) -> Result<()> {
    axum::serve(listener, router(metrics))
        .await
        .context("telemetry endpoint crashed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn counts_alerts_and_rejections() {
        let metrics = Metrics::new().unwrap();
        metrics.alert_received("firing");
        metrics.alert_received("firing");
        metrics.alert_received("resolved");
        metrics.request_rejected(StatusCode::UNAUTHORIZED);

        let text = String::from_utf8(metrics.encode().unwrap()).unwrap();
        assert!(text.contains(r#"alert_logger_webhook_received_alerts{status="firing"} 2"#));
        assert!(text.contains(r#"alert_logger_webhook_received_alerts{status="resolved"} 1"#));
        assert!(text.contains(r#"alert_logger_webhook_rejected_requests{code="401"} 1"#));
    }

    #[test]
    fn registries_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.alert_received("firing");

        let text = String::from_utf8(second.encode().unwrap()).unwrap();
        assert!(!text.contains(r#"status="firing""#));
    }

    #[tokio::test]
    async fn serves_metrics_as_text() {
        let metrics = Metrics::new().unwrap();
        metrics.alert_received("resolved");

        let response = router(metrics)
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], TEXT_FORMAT);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("received_alerts"));
    }
}
