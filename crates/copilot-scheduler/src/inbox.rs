//! Recent-mail listing with one documented bound on the message count.

use serde::Serialize;

use crate::error::Result;
use crate::gateway::{EmailSummary, MailGateway};

/// How many messages to request from the mail provider.
///
/// Requests are clamped into `MIN..=MAX`, never rejected; an absent request
/// means `DEFAULT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MessageLimit(usize);

impl MessageLimit {
    pub const MIN: usize = 1;
    pub const MAX: usize = 50;
    pub const DEFAULT: usize = 5;

    pub fn new(requested: Option<i64>) -> Self {
        match requested {
            None => Self(Self::DEFAULT),
            Some(n) => {
                let clamped = n.clamp(Self::MIN as i64, Self::MAX as i64);
                Self(clamped as usize)
            }
        }
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for MessageLimit {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// The newest messages, at most `requested` (clamped) of them.
pub fn latest_emails<G: MailGateway>(
    gateway: &G,
    requested: Option<i64>,
) -> Result<Vec<EmailSummary>> {
    let limit = MessageLimit::new(requested);
    tracing::debug!(limit = limit.get(), "listing latest messages");
    let mut messages = gateway.list_messages(limit)?;
    // Newest first and at most `limit`, whatever the provider returned.
    messages.sort_by(|a, b| b.date.cmp(&a.date));
    messages.truncate(limit.get());
    Ok(messages)
}
