//! shared setup for the integration tests: a receiver with a fixed clock whose log
//! output is captured in memory
#![allow(dead_code)]

use std::{
    io,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use alert_logger::{
    alertmanager_webhook_receiver::{self as receiver, ReceiverState},
    clock::{Clock, FixedClock},
    log::{self, Logger},
    settings::AuthToken,
    telemetry_endpoint::Metrics,
};
use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
        Request,
    },
    Router,
};
use chrono::DateTime;
use serde_json::Value;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{filter::LevelFilter, fmt::MakeWriter};

pub const TOKEN: &str = "s3cret";
pub const TIME: &str = "2022-05-30T14:02:11.204311+02:00";
pub const CLIENT: [u8; 4] = [10, 0, 0, 7];

pub const VALID_ALERT: &str =
    r#"{"receiver":"r","status":"firing","alerts":[],"groupLabels":{}}"#;

/// in-memory log sink
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn records(&self) -> Vec<Value> {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// records of one kind, e.g. `alert` or `request`
    pub fn with_message(&self, message: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|record| record["message"] == message)
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|record| record["message"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<ReceiverState>,
    pub logs: Capture,
    _guard: DefaultGuard,
}

pub fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(DateTime::parse_from_rfc3339(TIME).unwrap()))
}

/// installs a capturing subscriber for the current thread
pub fn capture_logs(level: LevelFilter) -> (Capture, DefaultGuard) {
    let logs = Capture::default();
    let subscriber = log::subscriber(level, clock(), logs.clone()).unwrap();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

pub fn state() -> Arc<ReceiverState> {
    Arc::new(ReceiverState::new(
        AuthToken::new(Some(TOKEN.into())).unwrap(),
        Logger::new(clock()),
        Metrics::new().unwrap(),
    ))
}

pub fn setup() -> TestApp {
    let (logs, guard) = capture_logs(LevelFilter::INFO);
    let state = state();
    let router = receiver::router(state.clone())
        .layer(MockConnectInfo(SocketAddr::from((CLIENT, 48213))));

    TestApp {
        router,
        state,
        logs,
        _guard: guard,
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// POST `body` to `/` with a matching Content-Length
pub fn post(body: &str, authorization: Option<&str>) -> Request<Body> {
    post_to("/", body, authorization)
}

pub fn post_to(uri: &str, body: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_LENGTH, body.len());

    if let Some(authorization) = authorization {
        builder = builder.header(AUTHORIZATION, authorization);
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
