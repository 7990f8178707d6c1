//! Everything a request handler needs, built once at start-up.
//!
//! Handlers receive a `&SchedulerContext` instead of reaching for
//! process-wide client handles, so tests can build one around in-memory
//! gateways and a fixed clock.

use crate::clock::{Clock, ClockProvider, TimeSnapshot};
use crate::config::SchedulerConfig;
use crate::conflict::EventInterval;
use crate::error::Result;
use crate::freebusy::FreeSlot;
use crate::gateway::{CalendarGateway, EmailSummary, MailGateway};
use crate::inbox::latest_emails;
use crate::resolve::{resolve, resolve_now, ResolvedDatetime};
use crate::scheduler::{EventConfirmation, EventScheduler};

pub type DynCalendarGateway = Box<dyn CalendarGateway + Send + Sync>;
pub type DynMailGateway = Box<dyn MailGateway + Send + Sync>;

pub struct SchedulerContext {
    config: SchedulerConfig,
    clock: ClockProvider,
    scheduler: EventScheduler<DynCalendarGateway>,
    mail: DynMailGateway,
}

impl SchedulerContext {
    pub fn new(
        config: SchedulerConfig,
        clock: impl Clock + 'static,
        calendar: impl CalendarGateway + Send + Sync + 'static,
        mail: impl MailGateway + Send + Sync + 'static,
    ) -> Result<Self> {
        let calendar: DynCalendarGateway = Box::new(calendar);
        let scheduler = EventScheduler::new(calendar, config.calendar_id.clone())
            .with_offset(config.offset)
            .with_default_duration(config.default_duration_secs)?;
        Ok(Self {
            clock: ClockProvider::new(clock, config.offset),
            scheduler,
            mail: Box::new(mail),
            config,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn clock(&self) -> &ClockProvider {
        &self.clock
    }

    pub fn scheduler(&self) -> &EventScheduler<DynCalendarGateway> {
        &self.scheduler
    }

    pub fn now(&self) -> TimeSnapshot {
        self.clock.now()
    }

    pub fn resolve(&self, expression: &str) -> Result<ResolvedDatetime> {
        resolve_now(expression, &self.clock)
    }

    /// Schedule from absolute ISO strings.
    pub fn schedule(
        &self,
        title: &str,
        start_iso: &str,
        end_iso: Option<&str>,
    ) -> Result<EventConfirmation> {
        self.scheduler.schedule(title, start_iso, end_iso)
    }

    /// Resolve `start_expr` and `end_expr` against one clock reading and
    /// validate the result. Expressions may be absolute ISO strings.
    pub fn candidate(
        &self,
        title: &str,
        start_expr: &str,
        end_expr: Option<&str>,
    ) -> Result<EventInterval> {
        let anchor = self.clock.instant();
        let offset = self.clock.offset();
        let start = resolve(start_expr, anchor, offset)?;
        let end = end_expr
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|e| resolve(e, anchor, offset))
            .transpose()?;
        self.scheduler
            .validate(title, &start.iso, end.as_ref().map(|e| e.iso.as_str()))
    }

    /// [`SchedulerContext::candidate`] followed by scheduling it.
    pub fn schedule_relative(
        &self,
        title: &str,
        start_expr: &str,
        end_expr: Option<&str>,
    ) -> Result<EventConfirmation> {
        let candidate = self.candidate(title, start_expr, end_expr)?;
        self.scheduler.schedule_interval(&candidate)
    }

    /// First free slot as long as `candidate` within `horizon_secs` of its start.
    pub fn suggest_alternative(
        &self,
        candidate: &EventInterval,
        horizon_secs: i64,
    ) -> Result<Option<FreeSlot>> {
        self.scheduler.suggest_alternative(candidate, horizon_secs)
    }

    pub fn latest_emails(&self, requested: Option<i64>) -> Result<Vec<EmailSummary>> {
        latest_emails(&self.mail, requested)
    }
}

impl std::fmt::Debug for SchedulerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerContext")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
