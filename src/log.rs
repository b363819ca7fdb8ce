//! structured logging: every record is written as exactly one json object per line
//!
//! Records are built as ordered json maps and handed to `tracing` in a single `record`
//! field on the [`RECORD_TARGET`] target. [`JsonLines`] writes those verbatim and renders
//! every other event (our own diagnostics, hyper, ...) in the same shape so the output
//! stream stays machine readable.
use std::{cmp, fmt, sync::Arc};

use anyhow::Result;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, MakeWriter},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::clock::Clock;

pub type Record = Map<String, Value>;

pub const RECORD_TARGET: &str = "alert_logger::record";
const RECORD_FIELD: &str = "record";

/// keys of an alert record that the payload can't override
const RESERVED_ALERT_KEYS: [&str; 3] = ["message", "time", "log-level"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level `{0}`, expected one of TRACE, DEBUG, INFO, WARNING, ERROR, CRITICAL")]
pub struct LevelError(String);

/// parses `LOG_LEVEL`, accepting the usual level names in any case
pub fn parse_level(level: &str) -> Result<LevelFilter, LevelError> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok(LevelFilter::TRACE),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "INFO" => Ok(LevelFilter::INFO),
        "WARN" | "WARNING" => Ok(LevelFilter::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(LevelFilter::ERROR),
        _ => Err(LevelError(level.to_string())),
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "error",
        Level::WARN => "warning",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        Level::TRACE => "trace",
    }
}

/// one line of the access log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub client_address: String,
    pub request_method: String,
    pub request_path: String,
    pub protocol_version: String,
    pub response_code: u16,
}

/// builds and emits the records, stamping each with the time of its clock
#[derive(Clone)]
pub struct Logger {
    clock: Arc<dyn Clock>,
}

impl Logger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn system_record(&self, log_level: &str, log: &str) -> Record {
        let mut record = Record::new();
        record.insert("message".into(), "system".into());
        record.insert("log-level".into(), log_level.into());
        record.insert("log".into(), log.into());
        record.insert("time".into(), self.clock.timestamp().into());
        record
    }

    pub fn request_record(&self, access: &Access) -> Record {
        let mut record = Record::new();
        record.insert("time".into(), self.clock.timestamp().into());
        record.insert("message".into(), "request".into());
        record.insert("log-level".into(), "info".into());
        record.insert(
            "client_address".into(),
            access.client_address.as_str().into(),
        );
        record.insert(
            "request_method".into(),
            access.request_method.as_str().into(),
        );
        record.insert("request_path".into(), access.request_path.as_str().into());
        record.insert(
            "protocol_version".into(),
            access.protocol_version.as_str().into(),
        );
        record.insert("response_code".into(), access.response_code.into());
        record
    }

    /// the payload is passed through untouched apart from the reserved keys
    pub fn alert_record(&self, payload: &Map<String, Value>) -> Record {
        let mut record = Record::new();
        record.insert("message".into(), "alert".into());
        record.insert("time".into(), self.clock.timestamp().into());
        record.insert("log-level".into(), "info".into());
        for (key, value) in payload {
            if !RESERVED_ALERT_KEYS.contains(&key.as_str()) {
                record.insert(key.clone(), value.clone());
            }
        }
        record
    }

    pub fn error_record(&self, response_code: u16, log: &str) -> Record {
        let mut record = Record::new();
        record.insert("message".into(), "error".into());
        record.insert("log-level".into(), "error".into());
        record.insert("response-code".into(), response_code.into());
        record.insert("log".into(), log.into());
        record.insert("time".into(), self.clock.timestamp().into());
        record
    }

    pub fn system(&self, log: &str) {
        emit(Level::INFO, self.system_record("info", log));
    }

    pub fn fatal(&self, log: &str) {
        emit(Level::ERROR, self.system_record("fatal", log));
    }

    pub fn request(&self, access: &Access) {
        emit(Level::INFO, self.request_record(access));
    }

    pub fn alert(&self, payload: &Map<String, Value>) {
        emit(Level::INFO, self.alert_record(payload));
    }

    pub fn error(&self, response_code: u16, log: &str) {
        emit(Level::ERROR, self.error_record(response_code, log));
    }
}

fn emit(level: Level, record: Record) {
    let line = Value::Object(record).to_string();
    let line = line.as_str();
    // the level of a callsite has to be known at compile time
    match level {
        Level::ERROR => tracing::error!(target: RECORD_TARGET, record = line),
        Level::WARN => tracing::warn!(target: RECORD_TARGET, record = line),
        Level::INFO => tracing::info!(target: RECORD_TARGET, record = line),
        Level::DEBUG => tracing::debug!(target: RECORD_TARGET, record = line),
        Level::TRACE => tracing::trace!(target: RECORD_TARGET, record = line),
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: Record,
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().into(), value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().into(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().into(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().into(), value.into());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().into(), value.into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields
            .insert(field.name().into(), format!("{:?}", value).into());
    }
}

/// event formatter writing one json object per line
pub struct JsonLines {
    clock: Arc<dyn Clock>,
}

impl JsonLines {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl<S, N> FormatEvent<S, N> for JsonLines
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();

        if metadata.target() == RECORD_TARGET {
            if let Some(Value::String(line)) = visitor.fields.get(RECORD_FIELD) {
                return writeln!(writer, "{}", line);
            }
        }

        let mut record = Record::new();
        record.insert("time".into(), self.clock.timestamp().into());
        record.insert(
            "message".into(),
            visitor
                .fields
                .remove("message")
                .unwrap_or_else(|| Value::String(String::new())),
        );
        record.insert("log-level".into(), level_name(metadata.level()).into());
        record.insert("target".into(), metadata.target().into());
        for (key, value) in visitor.fields {
            record.entry(key).or_insert(value);
        }

        writeln!(writer, "{}", Value::Object(record))
    }
}

/// subscriber writing json lines into `writer`, dropping everything below `level`
pub fn subscriber<W>(
    level: LevelFilter,
    clock: Arc<dyn Clock>,
    writer: W,
) -> Result<impl Subscriber + Send + Sync + 'static>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    // dependencies only get to talk about warnings and worse
    let dependency_level = cmp::min(level, LevelFilter::WARN);

    let filter_layer = EnvFilter::default()
        .add_directive(level.into())
        .add_directive(format!("hyper={}", dependency_level).parse()?)
        .add_directive(format!("tower={}", dependency_level).parse()?);

    Ok(tracing_subscriber::fmt()
        .event_format(JsonLines::new(clock))
        .with_writer(writer)
        .with_env_filter(filter_layer)
        .finish())
}

/// installs the stdout subscriber for the whole process
pub fn setup_logging(level: LevelFilter, clock: Arc<dyn Clock>) -> Result<()> {
    subscriber(level, clock, std::io::stdout)?.try_init()?;

    Ok(())
}
