//! Current date and time in the representations callers ask for.
//!
//! The clock is the only place that reads the host time. Everything
//! downstream receives an explicit instant or [`TimeSnapshot`], which keeps
//! the rest of the crate deterministic.

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::normalize::{to_iso, Timestamp, UtcOffset};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Reads `chrono::Utc::now()`, i.e. the OS clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// The current moment rendered in the operator offset.
///
/// Field formats follow the date and time tools the agent calls: an ISO
/// date, 24-hour and 12-hour clock readings, Unix seconds and milliseconds,
/// and English day and month names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSnapshot {
    /// `YYYY-MM-DD`.
    pub iso_date: String,
    /// `HH:MM:SS`, 24-hour.
    pub iso_time: String,
    /// Full `YYYY-MM-DDTHH:MM:SS±HH:MM`.
    pub iso_datetime: String,
    pub unix_seconds: i64,
    pub unix_millis: i64,
    /// e.g. `Saturday`.
    pub day_name: String,
    /// e.g. `June`.
    pub month_name: String,
    pub year: i32,
    /// e.g. `June 21, 2025`.
    pub readable_date: String,
    /// `MM/DD/YYYY`.
    pub short_date: String,
    /// e.g. `02:30:00 PM`.
    pub time_12hour: String,
    /// e.g. `02:30 PM`.
    pub time_short: String,
    pub am_pm: String,
    pub offset: UtcOffset,
}

/// Render `instant` as a [`TimeSnapshot`] in `offset`.
pub fn snapshot_at(instant: Timestamp, offset: UtcOffset) -> TimeSnapshot {
    let local = instant.with_timezone(&offset.fixed());
    TimeSnapshot {
        iso_date: local.format("%Y-%m-%d").to_string(),
        iso_time: local.format("%H:%M:%S").to_string(),
        iso_datetime: to_iso(instant, offset),
        unix_seconds: instant.timestamp(),
        unix_millis: instant.timestamp_millis(),
        day_name: local.format("%A").to_string(),
        month_name: local.format("%B").to_string(),
        year: local.year(),
        readable_date: local.format("%B %d, %Y").to_string(),
        short_date: local.format("%m/%d/%Y").to_string(),
        time_12hour: local.format("%I:%M:%S %p").to_string(),
        time_short: local.format("%I:%M %p").to_string(),
        am_pm: local.format("%p").to_string(),
        offset,
    }
}

/// A clock paired with the operator offset.
pub struct ClockProvider {
    clock: Box<dyn Clock>,
    offset: UtcOffset,
}

impl ClockProvider {
    pub fn new(clock: impl Clock + 'static, offset: UtcOffset) -> Self {
        Self {
            clock: Box::new(clock),
            offset,
        }
    }

    /// System clock in the given offset.
    pub fn system(offset: UtcOffset) -> Self {
        Self::new(SystemClock, offset)
    }

    /// A fresh snapshot of the current moment.
    pub fn now(&self) -> TimeSnapshot {
        snapshot_at(self.instant(), self.offset)
    }

    /// The current instant without rendering.
    pub fn instant(&self) -> Timestamp {
        self.clock.now()
    }

    /// Today's date in the operator offset.
    pub fn today(&self) -> NaiveDate {
        self.instant().with_timezone(&self.offset.fixed()).date_naive()
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl std::fmt::Debug for ClockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockProvider")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
