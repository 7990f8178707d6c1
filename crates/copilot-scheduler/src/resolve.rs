//! Resolution of relative date expressions into absolute ISO-8601 strings.
//!
//! This is the upstream half of the "never assume the date" contract: the
//! caller supplies the anchor instant (normally from
//! [`ClockProvider`](crate::clock::ClockProvider)), and the output is an
//! absolute string the [`normalize`](crate::normalize) and
//! [`scheduler`](crate::scheduler) modules accept as-is.
//!
//! The grammar is small. Anything outside it is rejected with
//! [`SchedulerError::Format`]; a bare weekday such as `"friday"` is rejected
//! too, since it could mean this week or next.
//!
//! # Grammar
//!
//! ```text
//! expr     := "now" | iso | day [time] | time | offset
//! iso      := full ISO-8601 with offset | YYYY-MM-DD
//! day      := "today" | "tomorrow" | "yesterday"
//!           | ("next" | "this" | "last") weekday
//!           | YYYY-MM-DD
//! time     := ["at"] (named | clock)
//! named    := morning | noon | lunch | afternoon | evening | night
//!           | midnight | "end of day" | eod
//! clock    := 2pm | 2:30pm | 2 pm | 14:00 | 14:30:00
//! offset   := "in" N unit | N unit "ago"
//! ```

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;

use crate::clock::ClockProvider;
use crate::error::{Result, SchedulerError};
use crate::normalize::{local_instant, parse_iso, to_iso, to_unix, Timestamp, UtcOffset};

/// An expression pinned to one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDatetime {
    /// `YYYY-MM-DDTHH:MM:SS±HH:MM` in the operator offset.
    pub iso: String,
    pub unix_seconds: i64,
    /// e.g. "Sunday, June 22, 2025 at 2:00 PM".
    pub interpretation: String,
}

/// Resolve `expression` relative to `anchor`, rendering in `offset`.
///
/// # Examples
///
/// ```
/// use copilot_scheduler::normalize::{parse_iso, UtcOffset};
/// use copilot_scheduler::resolve::resolve;
///
/// let anchor = parse_iso("2025-06-21T14:30:00+05:30").unwrap();
/// let r = resolve("tomorrow at 2pm", anchor, UtcOffset::IST).unwrap();
/// assert_eq!(r.iso, "2025-06-22T14:00:00+05:30");
/// ```
pub fn resolve(expression: &str, anchor: Timestamp, offset: UtcOffset) -> Result<ResolvedDatetime> {
    let instant = match parse_iso(expression) {
        Ok(ts) => Some(ts),
        Err(_) => resolve_instant(&normalize_expression(expression), anchor, offset),
    };
    let instant = instant.ok_or_else(|| {
        SchedulerError::Format(format!(
            "cannot resolve expression: '{}'",
            expression.trim()
        ))
    })?;

    let local = instant.with_timezone(&offset.fixed());
    Ok(ResolvedDatetime {
        iso: to_iso(instant, offset),
        unix_seconds: to_unix(instant),
        interpretation: local.format("%A, %B %-d, %Y at %-I:%M %p").to_string(),
    })
}

/// [`resolve`] anchored at the provider's current instant and offset.
pub fn resolve_now(expression: &str, clock: &ClockProvider) -> Result<ResolvedDatetime> {
    resolve(expression, clock.instant(), clock.offset())
}

fn resolve_instant(s: &str, anchor: Timestamp, offset: UtcOffset) -> Option<Timestamp> {
    if s == "now" {
        return Some(anchor);
    }
    if let Ok(ts) = parse_iso(s) {
        return Some(ts);
    }
    if let Some(ts) = relative_offset(s, anchor) {
        return Some(ts);
    }

    let today = anchor.with_timezone(&offset.fixed()).date_naive();
    let (date, time_part) = match split_day(s, today) {
        Some((date, "")) => return local_instant(date, NaiveTime::MIN, offset).ok(),
        Some(found) => found,
        // No day part: a bare time means today.
        None => (today, s),
    };

    let time = parse_time_of_day(time_part.strip_prefix("at ").unwrap_or(time_part))?;
    local_instant(date, time, offset).ok()
}

/// Peel a leading day reference off `s`, returning the date and the rest.
fn split_day(s: &str, today: NaiveDate) -> Option<(NaiveDate, &str)> {
    let (first, rest) = split_word(s);
    match first {
        "today" => return Some((today, rest)),
        "tomorrow" => return Some((today.succ_opt()?, rest)),
        "yesterday" => return Some((today.pred_opt()?, rest)),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(first, "%Y-%m-%d") {
        return Some((date, rest));
    }

    let (day_word, rest) = split_word(rest);
    let weekday = parse_weekday(day_word)?;
    let date = match first {
        "next" => {
            let ahead = days_between(today.weekday(), weekday);
            today + Duration::days(if ahead == 0 { 7 } else { ahead })
        }
        "last" => {
            let back = days_between(weekday, today.weekday());
            today - Duration::days(if back == 0 { 7 } else { back })
        }
        "this" => {
            let diff = i64::from(weekday.num_days_from_monday())
                - i64::from(today.weekday().num_days_from_monday());
            today + Duration::days(diff)
        }
        _ => return None,
    };
    Some((date, rest))
}

/// Days forward from `from` to the next `to` (0 when equal).
fn days_between(from: Weekday, to: Weekday) -> i64 {
    (i64::from(to.num_days_from_monday()) - i64::from(from.num_days_from_monday())).rem_euclid(7)
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(' ') {
        Some((head, tail)) => (head, tail.trim_start()),
        None => (s, ""),
    }
}

/// `in 2 hours`, `30 minutes ago`.
fn relative_offset(s: &str, anchor: Timestamp) -> Option<Timestamp> {
    let (span, sign) = if let Some(rest) = s.strip_prefix("in ") {
        (rest, 1)
    } else if let Some(rest) = s.strip_suffix(" ago") {
        (rest, -1)
    } else {
        return None;
    };

    let (count, unit) = split_word(span);
    let count: i64 = match count {
        "a" | "an" => 1,
        n => n.parse().ok()?,
    };
    let unit_seconds = match unit {
        "minute" | "minutes" | "min" | "mins" => 60,
        "hour" | "hours" | "hr" | "hrs" => 3600,
        "day" | "days" => 86_400,
        "week" | "weeks" => 604_800,
        _ => return None,
    };
    let delta = Duration::try_seconds(sign * count.checked_mul(unit_seconds)?)?;
    anchor.checked_add_signed(delta)
}

fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let hms = |h, m| NaiveTime::from_hms_opt(h, m, 0);
    match s {
        "morning" => hms(9, 0),
        "noon" | "lunch" => hms(12, 0),
        "afternoon" => hms(13, 0),
        "end of day" | "eod" => hms(17, 0),
        "evening" => hms(18, 0),
        "night" => hms(21, 0),
        "midnight" => hms(0, 0),
        _ => parse_clock_time(s),
    }
}

/// `14:30`, `14:30:00`, `2pm`, `2:30 pm`. A bare `14` is refused.
fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let (digits, pm) = if let Some(d) = compact.strip_suffix("pm") {
        (d, Some(true))
    } else if let Some(d) = compact.strip_suffix("am") {
        (d, Some(false))
    } else {
        (compact.as_str(), None)
    };

    let mut fields = digits.split(':');
    let hour: u32 = fields.next()?.parse().ok()?;
    let minute: Option<u32> = match fields.next() {
        Some(m) => Some(m.parse().ok()?),
        None => None,
    };
    let second: u32 = match fields.next() {
        Some(sec) => sec.parse().ok()?,
        None => 0,
    };
    if fields.next().is_some() {
        return None;
    }

    let hour = match pm {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            hour % 12 + if pm { 12 } else { 0 }
        }
        None => {
            minute?;
            hour
        }
    };
    NaiveTime::from_hms_opt(hour, minute.unwrap_or(0), second)
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Lowercase, collapse whitespace, drop a leading "the".
fn normalize_expression(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let words = match words.split_first() {
        Some((&"the", rest)) => rest,
        _ => &words[..],
    };
    words.join(" ")
}
