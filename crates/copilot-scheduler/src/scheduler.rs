//! The validate → check conflicts → create workflow.
//!
//! [`EventScheduler::schedule`] is a linear state machine:
//!
//! ```text
//! Validating ──► CheckingConflicts ──► Creating ──► Confirmed
//!      │                 │                 │
//!      └────────────── Failed ◄────────────┘
//! ```
//!
//! Nothing is retried, and an event is either created once or not at all.
//!
//! # Known limitation
//!
//! Listing events and creating one are two separate gateway calls. Two
//! concurrent `schedule` calls for overlapping slots can both pass the
//! conflict check before either creates its event. The provider offers no
//! lock or conditional write to close this window.

use serde::Serialize;

use crate::conflict::{CalendarSnapshot, EventInterval};
use crate::error::{Result, SchedulerError};
use crate::freebusy::{find_first_free, FreeSlot};
use crate::gateway::{CalendarGateway, CalendarId, EventId};
use crate::normalize::{from_unix, parse_iso, to_iso, to_unix, UtcOffset};

/// Length of an event whose end time was not given.
pub const DEFAULT_DURATION_SECS: i64 = 3600;

/// Where a scheduling request is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScheduleStage {
    Validating,
    CheckingConflicts,
    Creating,
    Confirmed,
}

/// A created event as the caller should report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventConfirmation {
    pub event_id: EventId,
    pub title: String,
    pub start_unix: i64,
    pub end_unix: i64,
    /// Start in the scheduler's offset, `YYYY-MM-DDTHH:MM:SS±HH:MM`.
    pub start_iso: String,
    pub end_iso: String,
}

/// Schedules events on one calendar through a [`CalendarGateway`].
#[derive(Debug)]
pub struct EventScheduler<G> {
    gateway: G,
    calendar_id: CalendarId,
    offset: UtcOffset,
    default_duration: i64,
}

impl<G: CalendarGateway> EventScheduler<G> {
    /// A scheduler rendering in IST with a one-hour default duration.
    pub fn new(gateway: G, calendar_id: CalendarId) -> Self {
        Self {
            gateway,
            calendar_id,
            offset: UtcOffset::IST,
            default_duration: DEFAULT_DURATION_SECS,
        }
    }

    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    /// # Errors
    ///
    /// Returns [`SchedulerError::Config`] unless `seconds` is positive.
    pub fn with_default_duration(mut self, seconds: i64) -> Result<Self> {
        if seconds <= 0 {
            return Err(SchedulerError::Config(format!(
                "default duration must be positive, got {seconds}s"
            )));
        }
        self.default_duration = seconds;
        Ok(self)
    }

    pub fn calendar_id(&self) -> &CalendarId {
        &self.calendar_id
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Create `title` from `start_iso` to `end_iso` if the slot is free.
    ///
    /// A missing (or blank) `end_iso` means `start + default duration`.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Format`] if either datetime is malformed
    /// - [`SchedulerError::InvalidInterval`] if the end is not after the start
    /// - [`SchedulerError::Gateway`] if listing or creating fails
    /// - [`SchedulerError::Conflict`] with every colliding event; nothing is created
    #[tracing::instrument(skip(self), fields(calendar = %self.calendar_id))]
    pub fn schedule(
        &self,
        title: &str,
        start_iso: &str,
        end_iso: Option<&str>,
    ) -> Result<EventConfirmation> {
        let mut stage = ScheduleStage::Validating;
        let result = self
            .validate(title, start_iso, end_iso)
            .and_then(|candidate| self.book(&mut stage, &candidate));
        log_outcome(stage, &result);
        result
    }

    /// Create an already validated `candidate` if the slot is free.
    ///
    /// # Errors
    ///
    /// As [`EventScheduler::schedule`], minus the validation errors.
    #[tracing::instrument(
        skip(self, candidate),
        fields(calendar = %self.calendar_id, title = candidate.title())
    )]
    pub fn schedule_interval(&self, candidate: &EventInterval) -> Result<EventConfirmation> {
        let mut stage = ScheduleStage::CheckingConflicts;
        let result = self.book(&mut stage, candidate);
        log_outcome(stage, &result);
        result
    }

    fn book(
        &self,
        stage: &mut ScheduleStage,
        candidate: &EventInterval,
    ) -> Result<EventConfirmation> {
        *stage = ScheduleStage::CheckingConflicts;
        tracing::debug!(stage = ?stage, start = candidate.start(), end = candidate.end());
        let snapshot = self.snapshot()?;
        let conflicts = snapshot.conflicts_with(candidate);
        if !conflicts.is_empty() {
            return Err(SchedulerError::Conflict(
                conflicts.into_iter().cloned().collect(),
            ));
        }

        *stage = ScheduleStage::Creating;
        tracing::debug!(stage = ?stage, existing = snapshot.len());
        let event_id = self.gateway.create_event(
            &self.calendar_id,
            candidate.title(),
            candidate.start(),
            candidate.end(),
        )?;

        *stage = ScheduleStage::Confirmed;
        self.confirm(event_id, candidate)
    }

    /// Normalize and check the requested interval without touching the gateway.
    pub fn validate(
        &self,
        title: &str,
        start_iso: &str,
        end_iso: Option<&str>,
    ) -> Result<EventInterval> {
        let start = to_unix(parse_iso(start_iso)?);
        let end = match end_iso.map(str::trim).filter(|s| !s.is_empty()) {
            Some(end_iso) => to_unix(parse_iso(end_iso)?),
            None => start.checked_add(self.default_duration).ok_or_else(|| {
                SchedulerError::InvalidInterval(format!("start {start} is too late to extend"))
            })?,
        };
        if start >= end {
            return Err(SchedulerError::InvalidInterval(format!(
                "end {} is not after start {}",
                end_iso.unwrap_or_default().trim(),
                start_iso.trim()
            )));
        }
        EventInterval::new(title, start, end)
    }

    /// Fetch the calendar fresh from the gateway.
    pub fn snapshot(&self) -> Result<CalendarSnapshot> {
        Ok(CalendarSnapshot::new(
            self.gateway.list_events(&self.calendar_id)?,
        ))
    }

    /// The first free slot as long as `candidate`, starting no earlier than
    /// it and within `horizon_secs` of its start.
    pub fn suggest_alternative(
        &self,
        candidate: &EventInterval,
        horizon_secs: i64,
    ) -> Result<Option<FreeSlot>> {
        let snapshot = self.snapshot()?;
        find_first_free(
            candidate.start(),
            candidate.duration_seconds(),
            snapshot.events(),
            candidate.start().saturating_add(horizon_secs),
        )
    }

    fn confirm(&self, event_id: EventId, interval: &EventInterval) -> Result<EventConfirmation> {
        Ok(EventConfirmation {
            event_id,
            title: interval.title().to_string(),
            start_unix: interval.start(),
            end_unix: interval.end(),
            start_iso: to_iso(from_unix(interval.start())?, self.offset),
            end_iso: to_iso(from_unix(interval.end())?, self.offset),
        })
    }
}

fn log_outcome(stage: ScheduleStage, result: &Result<EventConfirmation>) {
    match result {
        Ok(confirmation) => tracing::info!(
            event_id = %confirmation.event_id,
            start = %confirmation.start_iso,
            end = %confirmation.end_iso,
            "event created"
        ),
        Err(SchedulerError::Conflict(hits)) => {
            tracing::warn!(stage = ?stage, conflicts = hits.len(), "slot is taken")
        }
        Err(e) => tracing::warn!(stage = ?stage, error = %e, "scheduling failed"),
    }
}
