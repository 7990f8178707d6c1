use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{CalendarGateway, CalendarId, EmailSummary, EventId, MailGateway};
use crate::conflict::EventInterval;
use crate::error::GatewayError;
use crate::inbox::MessageLimit;

type Calendars = HashMap<CalendarId, Vec<EventInterval>>;

/// A process-local calendar and mailbox.
///
/// Backs tests and offline demos. Ids are `evt-1`, `evt-2`, ... in creation
/// order. [`MemoryGateway::fail_with`] makes every later call fail;
/// [`MemoryGateway::fail_create_with`] fails only `create_event`, so a
/// calendar can be listed and then refuse the write.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    calendars: Mutex<Calendars>,
    messages: Vec<EmailSummary>,
    failure: Mutex<Option<GatewayError>>,
    create_failure: Mutex<Option<GatewayError>>,
    next_id: AtomicU64,
    create_calls: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a calendar with its existing events.
    pub fn with_calendar(mut self, id: impl Into<String>, events: Vec<EventInterval>) -> Self {
        if let Ok(calendars) = self.calendars.get_mut() {
            calendars.insert(CalendarId(id.into()), events);
        }
        self
    }

    pub fn with_messages(mut self, messages: Vec<EmailSummary>) -> Self {
        self.messages = messages;
        self
    }

    /// Fail every subsequent call with `error`.
    pub fn fail_with(&self, error: GatewayError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }

    /// Fail every subsequent `create_event` with `error`; listing still works.
    pub fn fail_create_with(&self, error: GatewayError) {
        if let Ok(mut failure) = self.create_failure.lock() {
            *failure = Some(error);
        }
    }

    /// How many times `create_event` has been invoked, successful or not.
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Current events on a calendar, or `None` if it was never registered.
    pub fn events(&self, id: &CalendarId) -> Option<Vec<EventInterval>> {
        self.calendars.lock().ok()?.get(id).cloned()
    }

    fn check_failure(&self) -> Result<(), GatewayError> {
        check_flag(&self.failure)
    }

    fn calendars(&self) -> Result<MutexGuard<'_, Calendars>, GatewayError> {
        self.calendars
            .lock()
            .map_err(|_| GatewayError::Unavailable("calendar store poisoned".to_string()))
    }
}

impl CalendarGateway for MemoryGateway {
    fn list_events(&self, calendar_id: &CalendarId) -> Result<Vec<EventInterval>, GatewayError> {
        self.check_failure()?;
        self.calendars()?
            .get(calendar_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(calendar_id.to_string()))
    }

    fn create_event(
        &self,
        calendar_id: &CalendarId,
        title: &str,
        start_unix: i64,
        end_unix: i64,
    ) -> Result<EventId, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        check_flag(&self.create_failure)?;

        let mut calendars = self.calendars()?;
        let events = calendars
            .get_mut(calendar_id)
            .ok_or_else(|| GatewayError::NotFound(calendar_id.to_string()))?;

        let id = format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let event = EventInterval::new(title, start_unix, end_unix)
            .map_err(|e| GatewayError::Rejected(e.to_string()))?
            .with_id(id.clone());
        events.push(event);
        Ok(EventId(id))
    }
}

fn check_flag(flag: &Mutex<Option<GatewayError>>) -> Result<(), GatewayError> {
    let failure = flag
        .lock()
        .map_err(|_| GatewayError::Unavailable("failure flag poisoned".to_string()))?;
    match failure.as_ref() {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

impl MailGateway for MemoryGateway {
    fn list_messages(&self, limit: MessageLimit) -> Result<Vec<EmailSummary>, GatewayError> {
        self.check_failure()?;
        let mut messages = self.messages.clone();
        messages.sort_by(|a, b| b.date.cmp(&a.date));
        messages.truncate(limit.get());
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> CalendarId {
        CalendarId::from("primary")
    }

    #[test]
    fn test_create_then_list() {
        let gw = MemoryGateway::new().with_calendar("primary", vec![]);
        let id = gw.create_event(&calendar(), "Standup", 10, 20).unwrap();
        assert_eq!(id, EventId("evt-1".to_string()));
        let events = gw.list_events(&calendar()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id(), Some("evt-1"));
        assert_eq!(gw.create_calls(), 1);
    }

    #[test]
    fn test_unknown_calendar() {
        let gw = MemoryGateway::new();
        assert_eq!(
            gw.list_events(&calendar()).unwrap_err(),
            GatewayError::NotFound("primary".to_string())
        );
    }

    #[test]
    fn test_rejects_reversed_interval() {
        let gw = MemoryGateway::new().with_calendar("primary", vec![]);
        assert!(matches!(
            gw.create_event(&calendar(), "bad", 20, 10),
            Err(GatewayError::Rejected(_))
        ));
    }

    #[test]
    fn test_fail_with_applies_to_every_call() {
        let gw = MemoryGateway::new().with_calendar("primary", vec![]);
        gw.fail_with(GatewayError::Unavailable("down".to_string()));
        assert!(gw.list_events(&calendar()).is_err());
        assert!(gw.create_event(&calendar(), "x", 1, 2).is_err());
        assert!(gw.list_messages(MessageLimit::default()).is_err());
    }

    #[test]
    fn test_fail_create_with_still_lists() {
        let gw = MemoryGateway::new().with_calendar("primary", vec![]);
        gw.fail_create_with(GatewayError::Rejected("quota".to_string()));
        assert!(gw.list_events(&calendar()).unwrap().is_empty());
        assert_eq!(
            gw.create_event(&calendar(), "x", 1, 2).unwrap_err(),
            GatewayError::Rejected("quota".to_string())
        );
        assert_eq!(gw.create_calls(), 1);
        assert!(gw.events(&calendar()).unwrap().is_empty());
    }
}
