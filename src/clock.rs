//! time source for the `time` field of every log record
use chrono::{DateTime, FixedOffset, Local, SecondsFormat};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// iso-8601 with microseconds and an explicit utc offset, e.g. `2022-05-30T14:02:11.204311+02:00`
    fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Micros, false)
    }
}

/// wall clock in the local timezone of the process
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
