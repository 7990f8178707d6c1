//! Free time inside a window, given the busy intervals of a calendar.
//!
//! Used to offer alternatives when a requested slot conflicts.

use serde::Serialize;

use crate::conflict::EventInterval;
use crate::error::{Result, SchedulerError};

/// An unoccupied `[start, end)` span in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeSlot {
    pub start: i64,
    pub end: i64,
}

impl FreeSlot {
    pub fn duration_seconds(&self) -> i64 {
        self.end - self.start
    }
}

/// Gaps of at least `min_duration` seconds inside `[window_start, window_end)`.
///
/// Busy intervals may overlap each other and extend past the window; they
/// are clipped and merged first. Touching busy intervals leave no gap.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidInterval`] if the window is empty or
/// `min_duration` is not positive.
pub fn find_free_slots(
    window_start: i64,
    window_end: i64,
    busy: &[EventInterval],
    min_duration: i64,
) -> Result<Vec<FreeSlot>> {
    if window_start >= window_end {
        return Err(SchedulerError::InvalidInterval(format!(
            "window end {window_end} is not after start {window_start}"
        )));
    }
    if min_duration <= 0 {
        return Err(SchedulerError::InvalidInterval(format!(
            "minimum slot length must be positive, got {min_duration}s"
        )));
    }

    let merged = merge_busy(window_start, window_end, busy);

    let mut free = Vec::new();
    let mut cursor = window_start;
    for (start, end) in merged {
        if start - cursor >= min_duration {
            free.push(FreeSlot { start: cursor, end: start });
        }
        cursor = cursor.max(end);
    }
    if window_end - cursor >= min_duration {
        free.push(FreeSlot {
            start: cursor,
            end: window_end,
        });
    }
    Ok(free)
}

/// The earliest `duration`-second slot starting at or after `after` and
/// ending no later than `horizon_end`.
///
/// Returns `Ok(None)` when nothing fits before the horizon.
pub fn find_first_free(
    after: i64,
    duration: i64,
    busy: &[EventInterval],
    horizon_end: i64,
) -> Result<Option<FreeSlot>> {
    let slots = find_free_slots(after, horizon_end, busy, duration)?;
    Ok(slots.first().map(|slot| FreeSlot {
        start: slot.start,
        end: slot.start + duration,
    }))
}

/// Clip busy intervals to the window, sort, and coalesce overlapping or
/// touching spans.
fn merge_busy(window_start: i64, window_end: i64, busy: &[EventInterval]) -> Vec<(i64, i64)> {
    let mut spans: Vec<(i64, i64)> = busy
        .iter()
        .filter(|e| e.start() < window_end && e.end() > window_start)
        .map(|e| (e.start().max(window_start), e.end().min(window_end)))
        .collect();
    spans.sort_unstable();

    let mut merged: Vec<(i64, i64)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn busy(spans: &[(i64, i64)]) -> Vec<EventInterval> {
        spans
            .iter()
            .map(|&(s, e)| EventInterval::new("busy", s, e).unwrap())
            .collect()
    }

    #[test]
    fn test_free_slots_empty_calendar() {
        let slots = find_free_slots(0, 100, &[], 10).unwrap();
        assert_eq!(slots, vec![FreeSlot { start: 0, end: 100 }]);
    }

    #[test]
    fn test_free_slots_between_events() {
        let slots = find_free_slots(0, 100, &busy(&[(10, 20), (50, 60)]), 5).unwrap();
        assert_eq!(
            slots,
            vec![
                FreeSlot { start: 0, end: 10 },
                FreeSlot { start: 20, end: 50 },
                FreeSlot { start: 60, end: 100 },
            ]
        );
    }

    #[test]
    fn test_free_slots_merges_overlapping_and_touching() {
        let slots =
            find_free_slots(0, 100, &busy(&[(30, 50), (10, 20), (20, 35), (45, 60)]), 1).unwrap();
        assert_eq!(
            slots,
            vec![FreeSlot { start: 0, end: 10 }, FreeSlot { start: 60, end: 100 }]
        );
    }

    #[test]
    fn test_free_slots_respects_min_duration() {
        let slots = find_free_slots(0, 100, &busy(&[(5, 20), (25, 90)]), 10).unwrap();
        assert_eq!(slots, vec![FreeSlot { start: 90, end: 100 }]);
    }

    #[test]
    fn test_free_slots_clips_events_outside_window() {
        let slots = find_free_slots(100, 200, &busy(&[(0, 120), (180, 300)]), 1).unwrap();
        assert_eq!(slots, vec![FreeSlot { start: 120, end: 180 }]);
    }

    #[test]
    fn test_free_slots_invalid_window() {
        assert!(find_free_slots(100, 100, &[], 1).is_err());
        assert!(find_free_slots(0, 100, &[], 0).is_err());
    }

    #[test]
    fn test_first_free_after_conflict() {
        // Standup 09:00-10:00 IST; a 1h request at 09:30 should move to 10:00
        let cal = busy(&[(1_750_476_600, 1_750_480_200)]);
        let slot = find_first_free(1_750_478_400, 3600, &cal, 1_750_478_400 + 86_400)
            .unwrap()
            .unwrap();
        assert_eq!(slot.start, 1_750_480_200);
        assert_eq!(slot.duration_seconds(), 3600);
    }

    #[test]
    fn test_first_free_none_before_horizon() {
        let cal = busy(&[(0, 100)]);
        assert_eq!(find_first_free(0, 50, &cal, 120).unwrap(), None);
    }

    proptest! {
        #[test]
        fn prop_free_slots_never_overlap_busy(
            spans in prop::collection::vec((0i64..1000, 1i64..100), 0..30),
            min in 1i64..50,
        ) {
            let cal: Vec<_> = spans.iter().map(|&(s, l)| EventInterval::new("b", s, s + l).unwrap()).collect();
            let slots = find_free_slots(0, 1100, &cal, min).unwrap();
            for slot in &slots {
                prop_assert!(slot.duration_seconds() >= min);
                let probe = EventInterval::new("probe", slot.start, slot.end).unwrap();
                prop_assert!(!crate::conflict::has_conflict(&probe, &cal));
            }
        }
    }
}
