//! End-to-end scheduling against the in-memory provider.

use copilot_scheduler::{
    resolve, CalendarGateway, CalendarId, EventInterval, EventScheduler, GatewayError,
    MemoryGateway, SchedulerError, UtcOffset,
};

fn primary() -> CalendarId {
    CalendarId::from("primary")
}

fn standup_calendar() -> MemoryGateway {
    let standup = EventInterval::from_iso(
        "Standup",
        "2025-06-21T09:00:00+05:30",
        "2025-06-21T10:00:00+05:30",
    )
    .unwrap();
    MemoryGateway::new().with_calendar("primary", vec![standup])
}

#[test]
fn test_end_before_start_is_invalid_interval() {
    let gw = standup_calendar();
    let scheduler = EventScheduler::new(&gw, primary());
    let err = scheduler
        .schedule(
            "Standup",
            "2025-06-21T09:00:00+05:30",
            Some("2025-06-21T08:00:00+05:30"),
        )
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidInterval(_)));
}

#[test]
fn test_omitted_end_defaults_to_one_hour() {
    let gw = MemoryGateway::new().with_calendar("primary", vec![]);
    let scheduler = EventScheduler::new(&gw, primary());
    let confirmation = scheduler
        .schedule("Standup", "2025-06-21T09:00:00+05:30", None)
        .unwrap();
    assert_eq!(confirmation.end_unix, confirmation.start_unix + 3600);
}

#[test]
fn test_overlapping_candidate_is_rejected_without_create() {
    let gw = standup_calendar();
    let scheduler = EventScheduler::new(&gw, primary());
    let err = scheduler
        .schedule(
            "Planning",
            "2025-06-21T09:45:00+05:30",
            Some("2025-06-21T10:15:00+05:30"),
        )
        .unwrap_err();
    match err {
        SchedulerError::Conflict(hits) => assert_eq!(hits[0].title(), "Standup"),
        other => panic!("expected a conflict, got {other}"),
    }
    assert_eq!(gw.create_calls(), 0);
    assert_eq!(gw.events(&primary()).unwrap().len(), 1);
}

#[test]
fn test_second_booking_of_same_slot_conflicts() {
    let gw = MemoryGateway::new().with_calendar("primary", vec![]);
    let scheduler = EventScheduler::new(&gw, primary());
    let first = scheduler
        .schedule("Interview", "2025-06-22T14:00:00+05:30", None)
        .unwrap();
    assert_eq!(first.event_id.0, "evt-1");

    let err = scheduler
        .schedule("Interview again", "2025-06-22T08:30:00Z", None)
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(ref hits) if hits[0].id() == Some("evt-1")));
    assert_eq!(gw.create_calls(), 1);
}

#[test]
fn test_resolved_expression_flows_into_scheduler() {
    let anchor = copilot_scheduler::parse_iso("2025-06-21T14:30:00+05:30").unwrap();
    let start = resolve("tomorrow at 2pm", anchor, UtcOffset::IST).unwrap();

    let gw = MemoryGateway::new().with_calendar("primary", vec![]);
    let confirmation = EventScheduler::new(&gw, primary())
        .schedule("Interview", &start.iso, None)
        .unwrap();
    assert_eq!(confirmation.start_iso, "2025-06-22T14:00:00+05:30");

    let stored = gw.list_events(&primary()).unwrap();
    assert_eq!(stored[0].start(), start.unix_seconds);
}

#[test]
fn test_provider_outage_surfaces_as_gateway_error() {
    let gw = standup_calendar();
    gw.fail_with(GatewayError::Unavailable("connection reset".to_string()));
    let err = EventScheduler::new(&gw, primary())
        .schedule("Sync", "2025-06-21T12:00:00+05:30", None)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Gateway error: provider unavailable: connection reset"
    );
}
