//! # copilot-scheduler
//!
//! Deterministic datetime normalization and conflict-free event scheduling
//! for calendar agents.
//!
//! An agent answering "book an interview tomorrow at 2 PM" should not guess
//! what tomorrow is, how IST maps to Unix time, or whether the slot is free.
//! This crate does those steps as plain functions so the agent only passes
//! strings through.
//!
//! ## Modules
//!
//! - [`clock`]: current time as a [`TimeSnapshot`] in the operator offset
//! - [`normalize`]: ISO-8601 ↔ Unix timestamp conversion with fixed offsets
//! - [`resolve`]: relative expressions ("next friday at 10am") → absolute ISO
//! - [`conflict`]: half-open overlap checks against existing events
//! - [`freebusy`]: free slots and first-fit suggestions
//! - [`scheduler`]: validate → check conflicts → create workflow
//! - [`gateway`]: calendar/mail provider traits and an in-memory provider
//! - [`inbox`]: latest messages with a bounded count
//! - [`config`] / [`context`]: deployment settings and the per-process context
//! - [`error`]: Error types

pub mod clock;
pub mod config;
pub mod conflict;
pub mod context;
pub mod error;
pub mod freebusy;
pub mod gateway;
pub mod inbox;
pub mod normalize;
pub mod resolve;
pub mod scheduler;

pub use clock::{snapshot_at, Clock, ClockProvider, FixedClock, SystemClock, TimeSnapshot};
pub use config::SchedulerConfig;
pub use conflict::{find_conflicts, has_conflict, CalendarSnapshot, EventInterval};
pub use context::SchedulerContext;
pub use error::{GatewayError, SchedulerError};
pub use freebusy::{find_first_free, find_free_slots, FreeSlot};
pub use gateway::{
    CalendarGateway, CalendarId, EmailSummary, EventId, MailGateway, MemoryGateway,
};
pub use inbox::{latest_emails, MessageLimit};
pub use normalize::{
    absolute_iso, from_unix, parse_iso, to_iso, to_unix, Timestamp, UtcOffset,
};
pub use resolve::{resolve, resolve_now, ResolvedDatetime};
pub use scheduler::{EventConfirmation, EventScheduler, ScheduleStage, DEFAULT_DURATION_SECS};
