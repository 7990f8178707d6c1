//! JSON-file calendar and mailbox for running the scheduler locally.
//!
//! The calendar file maps calendar ids to event arrays:
//!
//! ```json
//! { "primary": [ { "id": "a1", "title": "Standup", "start": 1750476600, "end": 1750480200 } ] }
//! ```
//!
//! A missing file or calendar id is an empty calendar. The mailbox file is a
//! plain array of messages. Either store can be built without a path; it
//! then fails on first use.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use copilot_scheduler::{
    CalendarGateway, CalendarId, EmailSummary, EventId, EventInterval, GatewayError, MailGateway,
    MessageLimit,
};

type CalendarFile = BTreeMap<String, Vec<EventInterval>>;

#[derive(Debug, Clone)]
pub struct FileCalendar {
    path: Option<PathBuf>,
}

impl FileCalendar {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn path(&self) -> Result<&Path, GatewayError> {
        self.path.as_deref().ok_or_else(|| {
            GatewayError::Unavailable(
                "no calendar file: pass --calendar or set COPILOT_CALENDAR_FILE".to_string(),
            )
        })
    }

    fn load(&self) -> Result<CalendarFile, GatewayError> {
        let path = self.path()?;
        match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ok(CalendarFile::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                GatewayError::Unavailable(format!("corrupt calendar {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(CalendarFile::new()),
            Err(e) => Err(GatewayError::Unavailable(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    fn save(&self, calendars: &CalendarFile) -> Result<(), GatewayError> {
        let path = self.path()?;
        let json = serde_json::to_string_pretty(calendars)
            .map_err(|e| GatewayError::Rejected(e.to_string()))?;
        write_replace(path, &json).map_err(|e| {
            GatewayError::Unavailable(format!("cannot write {}: {e}", path.display()))
        })
    }
}

impl CalendarGateway for FileCalendar {
    fn list_events(&self, calendar_id: &CalendarId) -> Result<Vec<EventInterval>, GatewayError> {
        Ok(self
            .load()?
            .remove(&calendar_id.0)
            .unwrap_or_default())
    }

    fn create_event(
        &self,
        calendar_id: &CalendarId,
        title: &str,
        start_unix: i64,
        end_unix: i64,
    ) -> Result<EventId, GatewayError> {
        let mut calendars = self.load()?;
        let id = uuid::Uuid::new_v4().to_string();
        let event = EventInterval::new(title, start_unix, end_unix)
            .map_err(|e| GatewayError::Rejected(e.to_string()))?
            .with_id(id.clone());
        calendars
            .entry(calendar_id.0.clone())
            .or_default()
            .push(event);
        self.save(&calendars)?;
        tracing::debug!(calendar = %calendar_id, %id, "event written");
        Ok(EventId(id))
    }
}

#[derive(Debug, Clone)]
pub struct FileMailbox {
    path: Option<PathBuf>,
}

impl FileMailbox {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl MailGateway for FileMailbox {
    fn list_messages(&self, limit: MessageLimit) -> Result<Vec<EmailSummary>, GatewayError> {
        let path = self.path.as_deref().ok_or_else(|| {
            GatewayError::Unavailable(
                "no mailbox file: pass --mailbox or set COPILOT_MAILBOX_FILE".to_string(),
            )
        })?;
        let content = fs::read_to_string(path).map_err(|e| {
            GatewayError::Unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut messages: Vec<EmailSummary> = serde_json::from_str(&content).map_err(|e| {
            GatewayError::Unavailable(format!("corrupt mailbox {}: {e}", path.display()))
        })?;
        messages.sort_by(|a, b| b.date.cmp(&a.date));
        messages.truncate(limit.get());
        Ok(messages)
    }
}

/// Write through a uniquely named sibling temp file and rename it over
/// `path`, so readers never see a half-written calendar and concurrent
/// writers never share a temp file.
fn write_replace(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_write_replace_concurrent_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.json");
        let writers: Vec<_> = (0..8)
            .map(|n| {
                let path = path.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        write_replace(&path, &format!("{{\"writer\":{n},\"round\":{i}}}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let last: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(last["round"], 24);
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_calendar_round_trip_and_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let calendar = FileCalendar::new(Some(dir.path().join("cal.json")));
        let id = CalendarId::from("primary");
        assert!(calendar.list_events(&id).unwrap().is_empty());
        let event_id = calendar.create_event(&id, "Sync", 100, 200).unwrap();
        let events = calendar.list_events(&id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id(), Some(event_id.0.as_str()));

        let unset = FileCalendar::new(None);
        assert!(matches!(
            unset.list_events(&id),
            Err(GatewayError::Unavailable(_))
        ));
        assert!(FileMailbox::new(None)
            .list_messages(MessageLimit::default())
            .is_err());
    }
}
