//! Error types for scheduling operations.

use thiserror::Error;

use crate::conflict::EventInterval;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid datetime format: {0}")]
    Format(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Conflicts with {} existing event(s): {}", .0.len(), describe(.0))]
    Conflict(Vec<EventInterval>),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failure reported by an external calendar or mail provider.
///
/// The scheduler never retries these; retry policy belongs to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("calendar not found: {0}")]
    NotFound(String),
}

fn describe(events: &[EventInterval]) -> String {
    events
        .iter()
        .map(|e| format!("'{}' [{}, {})", e.title(), e.start(), e.end()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
