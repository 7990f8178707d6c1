//! Overlap detection between a candidate event and existing calendar events.
//!
//! Intervals are half-open `[start, end)` over Unix seconds, so an event
//! ending at 10:00 and another starting at 10:00 do not conflict.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::normalize::{parse_iso, to_unix};

/// A titled `[start, end)` span in Unix seconds.
///
/// Construction enforces `start < end`, including when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct EventInterval {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    title: String,
    start: i64,
    end: i64,
}

#[derive(Deserialize)]
struct RawInterval {
    #[serde(default)]
    id: Option<String>,
    title: String,
    start: i64,
    end: i64,
}

impl TryFrom<RawInterval> for EventInterval {
    type Error = SchedulerError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        let interval = EventInterval::new(raw.title, raw.start, raw.end)?;
        Ok(match raw.id {
            Some(id) => interval.with_id(id),
            None => interval,
        })
    }
}

impl EventInterval {
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidInterval`] unless `start < end`.
    pub fn new(title: impl Into<String>, start: i64, end: i64) -> Result<Self> {
        let title = title.into();
        if start >= end {
            return Err(SchedulerError::InvalidInterval(format!(
                "'{title}' ends at {end}, which is not after its start {start}"
            )));
        }
        Ok(Self {
            id: None,
            title,
            start,
            end,
        })
    }

    /// Build from two absolute ISO-8601 strings.
    pub fn from_iso(title: impl Into<String>, start: &str, end: &str) -> Result<Self> {
        let start = to_unix(parse_iso(start)?);
        let end = to_unix(parse_iso(end)?);
        Self::new(title, start, end)
    }

    /// Attach the provider's event identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn duration_seconds(&self) -> i64 {
        self.end - self.start
    }

    /// Half-open overlap: `self.start < other.end && other.start < self.end`.
    pub fn overlaps(&self, other: &EventInterval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Whether `candidate` overlaps any event in `existing`.
///
/// # Examples
///
/// ```
/// use copilot_scheduler::conflict::{has_conflict, EventInterval};
///
/// let a = EventInterval::new("a", 10, 20).unwrap();
/// let touching = EventInterval::new("b", 20, 30).unwrap();
/// let overlapping = EventInterval::new("c", 15, 25).unwrap();
/// assert!(!has_conflict(&a, &[touching]));
/// assert!(has_conflict(&a, &[overlapping]));
/// ```
pub fn has_conflict(candidate: &EventInterval, existing: &[EventInterval]) -> bool {
    existing.iter().any(|e| candidate.overlaps(e))
}

/// Every event in `existing` that overlaps `candidate`, in input order.
pub fn find_conflicts<'a>(
    candidate: &EventInterval,
    existing: &'a [EventInterval],
) -> Vec<&'a EventInterval> {
    existing.iter().filter(|e| candidate.overlaps(e)).collect()
}

// ── CalendarSnapshot ────────────────────────────────────────────────────────

/// Events fetched from a gateway for one conflict check, sorted by start.
///
/// A snapshot is never cached across requests; it is only as fresh as the
/// gateway round trip that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalendarSnapshot {
    events: Vec<EventInterval>,
}

impl CalendarSnapshot {
    pub fn new(mut events: Vec<EventInterval>) -> Self {
        events.sort_by_key(|e| (e.start, e.end));
        Self { events }
    }

    pub fn events(&self) -> &[EventInterval] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events overlapping `candidate`, ordered by start.
    ///
    /// Binary search drops every event starting at or after `candidate.end`;
    /// only the remaining prefix is scanned for `end > candidate.start`.
    pub fn conflicts_with(&self, candidate: &EventInterval) -> Vec<&EventInterval> {
        let upper = self.events.partition_point(|e| e.start < candidate.end);
        self.events[..upper]
            .iter()
            .filter(|e| e.end > candidate.start)
            .collect()
    }

    pub fn has_conflict(&self, candidate: &EventInterval) -> bool {
        let upper = self.events.partition_point(|e| e.start < candidate.end);
        self.events[..upper].iter().any(|e| e.end > candidate.start)
    }
}

impl From<Vec<EventInterval>> for CalendarSnapshot {
    fn from(events: Vec<EventInterval>) -> Self {
        Self::new(events)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn iv(start: i64, end: i64) -> EventInterval {
        EventInterval::new("e", start, end).unwrap()
    }

    #[test]
    fn test_touching_endpoints_do_not_conflict() {
        assert!(!has_conflict(&iv(10, 20), &[iv(20, 30)]));
        assert!(!has_conflict(&iv(20, 30), &[iv(10, 20)]));
    }

    #[test]
    fn test_partial_overlap_conflicts() {
        assert!(has_conflict(&iv(10, 20), &[iv(15, 25)]));
    }

    #[test]
    fn test_containment_conflicts() {
        assert!(has_conflict(&iv(10, 40), &[iv(20, 30)]));
        assert!(has_conflict(&iv(20, 30), &[iv(10, 40)]));
    }

    #[test]
    fn test_identical_intervals_conflict() {
        assert!(has_conflict(&iv(10, 20), &[iv(10, 20)]));
    }

    #[test]
    fn test_empty_calendar_never_conflicts() {
        assert!(!has_conflict(&iv(10, 20), &[]));
    }

    #[test]
    fn test_find_conflicts_returns_all_colliders() {
        let existing = vec![iv(0, 5), iv(8, 12), iv(12, 14), iv(19, 25), iv(30, 40)];
        let hits = find_conflicts(&iv(10, 20), &existing);
        let spans: Vec<_> = hits.iter().map(|e| (e.start(), e.end())).collect();
        assert_eq!(spans, vec![(8, 12), (12, 14), (19, 25)]);
    }

    #[test]
    fn test_new_rejects_empty_and_reversed() {
        assert!(matches!(
            EventInterval::new("x", 20, 20),
            Err(SchedulerError::InvalidInterval(_))
        ));
        assert!(EventInterval::new("x", 20, 10).is_err());
    }

    #[test]
    fn test_from_iso() {
        let e = EventInterval::from_iso(
            "Standup",
            "2025-06-21T09:00:00+05:30",
            "2025-06-21T10:00:00+05:30",
        )
        .unwrap();
        assert_eq!(e.start(), 1_750_476_600);
        assert_eq!(e.end(), 1_750_480_200);
        assert_eq!(e.duration_seconds(), 3600);
    }

    #[test]
    fn test_deserialize_enforces_invariant() {
        let ok: EventInterval =
            serde_json::from_str(r#"{"id":"ev1","title":"Sync","start":10,"end":20}"#).unwrap();
        assert_eq!(ok.id(), Some("ev1"));
        let bad = serde_json::from_str::<EventInterval>(r#"{"title":"Sync","start":20,"end":10}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_serialize_omits_missing_id() {
        let json = serde_json::to_string(&iv(1, 2)).unwrap();
        assert_eq!(json, r#"{"title":"e","start":1,"end":2}"#);
    }

    #[test]
    fn test_snapshot_sorts_and_finds() {
        let snap = CalendarSnapshot::new(vec![iv(30, 40), iv(0, 5), iv(8, 12), iv(19, 25)]);
        assert_eq!(snap.events()[0].start(), 0);
        let hits: Vec<_> = snap
            .conflicts_with(&iv(10, 20))
            .iter()
            .map(|e| e.start())
            .collect();
        assert_eq!(hits, vec![8, 19]);
        assert!(!snap.has_conflict(&iv(25, 30)));
    }

    proptest! {
        #[test]
        fn prop_conflict_is_symmetric(
            a_start in -1000i64..1000, a_len in 1i64..500,
            b_start in -1000i64..1000, b_len in 1i64..500,
        ) {
            let a = iv(a_start, a_start + a_len);
            let b = iv(b_start, b_start + b_len);
            prop_assert_eq!(
                has_conflict(&a, std::slice::from_ref(&b)),
                has_conflict(&b, std::slice::from_ref(&a))
            );
        }

        #[test]
        fn prop_snapshot_matches_linear_scan(
            spans in prop::collection::vec((0i64..1000, 1i64..100), 0..40),
            c_start in 0i64..1000, c_len in 1i64..200,
        ) {
            let events: Vec<_> = spans.iter().map(|&(s, l)| iv(s, s + l)).collect();
            let candidate = iv(c_start, c_start + c_len);
            let snap = CalendarSnapshot::new(events.clone());
            prop_assert_eq!(snap.has_conflict(&candidate), has_conflict(&candidate, &events));
            prop_assert_eq!(
                snap.conflicts_with(&candidate).len(),
                find_conflicts(&candidate, &events).len()
            );
        }
    }
}
