//! Interfaces to the external calendar and mail provider.
//!
//! The provider itself (its REST API, auth grants, retries and timeouts) is
//! not part of this crate. Schedulers and inbox helpers only see these
//! traits, so a hosted client, a file-backed store or the in-memory
//! [`MemoryGateway`] can be swapped in without touching the workflow.
//!
//! Calls are synchronous and carry no transactional guarantee: listing
//! events and then creating one is a read-then-write sequence that two
//! concurrent callers can interleave.

mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conflict::EventInterval;
use crate::error::GatewayError;
use crate::inbox::MessageLimit;

pub use memory::MemoryGateway;

/// Opaque provider identifier for one calendar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarId(pub String);

impl fmt::Display for CalendarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CalendarId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier the provider assigned to a created event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message as listed by the mail provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    pub subject: String,
    pub from: String,
    #[serde(default)]
    pub snippet: String,
    /// Unix seconds when the message was received.
    pub date: i64,
    #[serde(default)]
    pub unread: bool,
}

pub trait CalendarGateway {
    /// All events currently on `calendar_id`.
    fn list_events(&self, calendar_id: &CalendarId) -> Result<Vec<EventInterval>, GatewayError>;

    /// Create an event and return the provider's id for it.
    fn create_event(
        &self,
        calendar_id: &CalendarId,
        title: &str,
        start_unix: i64,
        end_unix: i64,
    ) -> Result<EventId, GatewayError>;
}

pub trait MailGateway {
    /// The most recent messages, newest first, at most `limit` of them.
    fn list_messages(&self, limit: MessageLimit) -> Result<Vec<EmailSummary>, GatewayError>;
}

impl<T: CalendarGateway + ?Sized> CalendarGateway for &T {
    fn list_events(&self, calendar_id: &CalendarId) -> Result<Vec<EventInterval>, GatewayError> {
        (**self).list_events(calendar_id)
    }

    fn create_event(
        &self,
        calendar_id: &CalendarId,
        title: &str,
        start_unix: i64,
        end_unix: i64,
    ) -> Result<EventId, GatewayError> {
        (**self).create_event(calendar_id, title, start_unix, end_unix)
    }
}

impl<T: CalendarGateway + ?Sized> CalendarGateway for Box<T> {
    fn list_events(&self, calendar_id: &CalendarId) -> Result<Vec<EventInterval>, GatewayError> {
        (**self).list_events(calendar_id)
    }

    fn create_event(
        &self,
        calendar_id: &CalendarId,
        title: &str,
        start_unix: i64,
        end_unix: i64,
    ) -> Result<EventId, GatewayError> {
        (**self).create_event(calendar_id, title, start_unix, end_unix)
    }
}

impl<T: MailGateway + ?Sized> MailGateway for &T {
    fn list_messages(&self, limit: MessageLimit) -> Result<Vec<EmailSummary>, GatewayError> {
        (**self).list_messages(limit)
    }
}

impl<T: MailGateway + ?Sized> MailGateway for Box<T> {
    fn list_messages(&self, limit: MessageLimit) -> Result<Vec<EmailSummary>, GatewayError> {
        (**self).list_messages(limit)
    }
}
