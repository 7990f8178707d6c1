//! Datetime normalization between ISO-8601 strings and Unix timestamps.
//!
//! Every string accepted here is already absolute: it names a calendar date,
//! a wall-clock time and a zone designator (`Z` or `±HH:MM`). Relative
//! phrases such as "tomorrow" are resolved upstream (see [`crate::resolve`])
//! and never reach this module. A string without a zone designator is
//! rejected instead of being interpreted in some implicit local zone.
//!
//! # Functions
//!
//! - [`parse_iso`]: ISO-8601 string → [`Timestamp`]
//! - [`to_unix`] / [`from_unix`]: [`Timestamp`] ↔ seconds since epoch
//! - [`to_iso`]: [`Timestamp`] → `YYYY-MM-DDTHH:MM:SS±HH:MM`
//! - [`absolute_iso`]: resolved date + time + offset → ISO string

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

use crate::error::{Result, SchedulerError};

/// The canonical instant type. Offsets are presentation only.
pub type Timestamp = DateTime<Utc>;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";
const ISO_FORMAT_NO_SECONDS: &str = "%Y-%m-%dT%H:%M%:z";

// ── UtcOffset ───────────────────────────────────────────────────────────────

/// A fixed UTC offset such as `+05:30`.
///
/// The deployment assumes a single operator timezone, so every rendered
/// datetime uses one of these rather than a per-user IANA zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UtcOffset {
    seconds: i32,
}

impl UtcOffset {
    /// `+00:00`.
    pub const UTC: UtcOffset = UtcOffset { seconds: 0 };

    /// Indian Standard Time, `+05:30`.
    pub const IST: UtcOffset = UtcOffset {
        seconds: 5 * 3600 + 30 * 60,
    };

    /// Build an offset from hours and minutes east of UTC.
    ///
    /// The sign of `hours` applies to the whole offset, so `(-3, 30)` is `-03:30`.
    pub fn from_hm(hours: i32, minutes: i32) -> Result<Self> {
        if !(0..60).contains(&minutes) || !(-23..=23).contains(&hours) {
            return Err(SchedulerError::Format(format!(
                "offset out of range: {hours}h{minutes}m"
            )));
        }
        let sign = if hours < 0 { -1 } else { 1 };
        Ok(Self {
            seconds: hours * 3600 + sign * minutes * 60,
        })
    }

    /// The offset an IANA zone has at the given instant.
    ///
    /// Used when the operator configures `Asia/Kolkata` instead of `+05:30`.
    /// The result is fixed: later DST transitions are not followed.
    pub fn from_zone(zone: &str, at: Timestamp) -> Result<Self> {
        let tz: Tz = zone
            .parse()
            .map_err(|_| SchedulerError::Config(format!("unknown timezone '{zone}'")))?;
        let seconds = tz
            .offset_from_utc_datetime(&at.naive_utc())
            .fix()
            .local_minus_utc();
        Ok(Self { seconds })
    }

    /// Seconds east of UTC.
    pub fn seconds(&self) -> i32 {
        self.seconds
    }

    pub(crate) fn fixed(&self) -> FixedOffset {
        // `seconds` is always within ±24h, which `east_opt` accepts.
        FixedOffset::east_opt(self.seconds).unwrap_or_else(|| Utc.fix())
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.seconds < 0 { '-' } else { '+' };
        let abs = self.seconds.unsigned_abs();
        write!(f, "{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
    }
}

impl FromStr for UtcOffset {
    type Err = SchedulerError;

    /// Accepts `Z`, `z` or `±HH:MM`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("z") {
            return Ok(Self::UTC);
        }
        let bytes = s.as_bytes();
        if bytes.len() != 6 || bytes[3] != b':' {
            return Err(SchedulerError::Format(format!(
                "offset must look like +HH:MM or Z: '{s}'"
            )));
        }
        let sign = match bytes[0] {
            b'+' => 1,
            b'-' => -1,
            _ => {
                return Err(SchedulerError::Format(format!(
                    "offset must start with '+' or '-': '{s}'"
                )));
            }
        };
        let hours: i32 = parse_two_digits(&s[1..3])
            .ok_or_else(|| SchedulerError::Format(format!("invalid offset hours in '{s}'")))?;
        let minutes: i32 = parse_two_digits(&s[4..6])
            .ok_or_else(|| SchedulerError::Format(format!("invalid offset minutes in '{s}'")))?;
        if hours > 23 || minutes > 59 {
            return Err(SchedulerError::Format(format!("offset out of range: '{s}'")));
        }
        Ok(Self {
            seconds: sign * (hours * 3600 + minutes * 60),
        })
    }
}

impl Serialize for UtcOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn parse_two_digits(s: &str) -> Option<i32> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

// ── Conversions ─────────────────────────────────────────────────────────────

/// Parse an absolute ISO-8601 datetime.
///
/// Accepted shapes:
///
/// - `2025-06-21T14:30:00Z`
/// - `2025-06-21T14:30:00+05:30`
/// - `2025-06-21T14:30:00.250+05:30` (fraction kept, truncated by [`to_unix`])
/// - `2025-06-21T14:30+05:30`
///
/// # Errors
///
/// Returns [`SchedulerError::Format`] when the string carries neither a `Z`
/// suffix nor a `±HH:MM` offset, or does not denote a real calendar datetime.
///
/// # Examples
///
/// ```
/// use copilot_scheduler::normalize::{parse_iso, to_unix};
///
/// let ts = parse_iso("2025-06-21T14:30:00+05:30").unwrap();
/// assert_eq!(to_unix(ts), 1_750_496_400);
/// assert!(parse_iso("2025-06-21T14:30:00").is_err());
/// ```
pub fn parse_iso(s: &str) -> Result<Timestamp> {
    let trimmed = s.trim();
    let candidate = match trimmed.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => trimmed.to_string(),
    };

    if !ends_with_offset(&candidate) {
        return Err(SchedulerError::Format(format!(
            "'{trimmed}': missing 'Z' suffix or ±HH:MM offset"
        )));
    }

    DateTime::parse_from_rfc3339(&candidate)
        .or_else(|_| DateTime::parse_from_str(&candidate, ISO_FORMAT_NO_SECONDS))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SchedulerError::Format(format!("'{trimmed}': {e}")))
}

/// Seconds since the Unix epoch. Sub-second precision is truncated.
pub fn to_unix(ts: Timestamp) -> i64 {
    ts.timestamp()
}

/// The instant `secs` seconds after the Unix epoch.
///
/// # Errors
///
/// Returns [`SchedulerError::Format`] if `secs` is outside chrono's range.
pub fn from_unix(secs: i64) -> Result<Timestamp> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| SchedulerError::Format(format!("unix timestamp out of range: {secs}")))
}

/// Render an instant as `YYYY-MM-DDTHH:MM:SS±HH:MM` in the given offset.
///
/// UTC renders as `+00:00`, never `Z`, so every output has the same shape.
pub fn to_iso(ts: Timestamp, offset: UtcOffset) -> String {
    ts.with_timezone(&offset.fixed()).format(ISO_FORMAT).to_string()
}

/// Combine an already-resolved date and wall-clock time into an ISO string.
///
/// This is the "tomorrow is 2025-06-22, 2 PM is 14:00, so send
/// `2025-06-22T14:00:00+05:30`" step. The caller supplies the date; nothing
/// here consults the clock.
pub fn absolute_iso(date: NaiveDate, time: NaiveTime, offset: UtcOffset) -> Result<String> {
    local_instant(date, time, offset).map(|ts| to_iso(ts, offset))
}

/// The instant a local date and time denote in a fixed offset.
pub fn local_instant(date: NaiveDate, time: NaiveTime, offset: UtcOffset) -> Result<Timestamp> {
    offset
        .fixed()
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| SchedulerError::Format(format!("{date}T{time} is not representable")))
}

/// Does `s` end in a `±HH:MM` offset?
fn ends_with_offset(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 6 {
        return false;
    }
    let tail = &bytes[bytes.len() - 6..];
    matches!(tail[0], b'+' | b'-')
        && tail[1].is_ascii_digit()
        && tail[2].is_ascii_digit()
        && tail[3] == b':'
        && tail[4].is_ascii_digit()
        && tail[5].is_ascii_digit()
}

// ── Tests ───────────────────────────────────────────────────────────────────
