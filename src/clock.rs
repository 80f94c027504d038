//! Wall-clock source used for timestamped artifact names.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Format of the timestamp suffix in artifact names.
pub const NAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The real local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl FixedClock {
    /// Freeze at a naive local time. Falls back to the current time if the
    /// local timezone cannot represent it (DST gap).
    pub fn at(naive: NaiveDateTime) -> Self {
        let instant = Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(Local::now);
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// `{last}_{first}_{timestamp}` name that keeps backend objects unique across runs.
pub fn artifact_name(last_name: &str, first_name: &str, at: DateTime<Local>) -> String {
    format!(
        "{}_{}_{}",
        last_name,
        first_name,
        at.format(NAME_TIMESTAMP_FORMAT)
    )
}
