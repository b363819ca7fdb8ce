//! decoding and validation of incoming alertmanager notifications
//!
//! The payload is kept as an untyped json object: only the keys below are checked and
//! everything else is passed through into the alert record.
use std::io;

use serde::Serialize;
use serde_json::{ser::Formatter, Map, Value};

use crate::error::HttpError;

pub const REQUIRED_KEYS: [&str; 4] = ["receiver", "status", "alerts", "groupLabels"];
pub const STATUSES: [&str; 2] = ["firing", "resolved"];

/// true if `payload` is an object with all required keys and a known status
pub fn is_valid_alert(payload: &Value) -> bool {
    payload.as_object().map_or(false, has_alert_shape)
}

fn has_alert_shape(data: &Map<String, Value>) -> bool {
    if !REQUIRED_KEYS.iter().all(|key| data.contains_key(*key)) {
        return false;
    }

    matches!(data.get("status"), Some(Value::String(status)) if STATUSES.contains(&status.as_str()))
}

/// parses and validates a request body
pub fn decode(body: &[u8]) -> Result<Map<String, Value>, HttpError> {
    let payload: Value = serde_json::from_slice(body).map_err(|err| {
        tracing::debug!("failed to deserialize alert: {}", err);
        HttpError::bad_payload()
    })?;

    match payload {
        Value::Object(data) if has_alert_shape(&data) => Ok(data),
        other => Err(HttpError::not_a_valid_alert(&echo(&other))),
    }
}

/// json as echoed in rejection messages: `", "` and `": "` separators and non-ascii
/// characters escaped as `\uXXXX`
pub fn echo(payload: &Value) -> String {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, SpacedAscii);
    match payload.serialize(&mut serializer) {
        Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
        Err(_) => payload.to_string(),
    }
}

struct SpacedAscii;

impl Formatter for SpacedAscii {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
