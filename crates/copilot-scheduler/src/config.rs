//! Deployment settings read from the environment or a `.env`-style file.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `COPILOT_OFFSET` | operator offset, `±HH:MM` | `+05:30` |
//! | `COPILOT_TIMEZONE` | IANA zone, resolved to a fixed offset at load time | unset |
//! | `NYLAS_CALENDAR_ID` | calendar to schedule on | `primary` |
//! | `NYLAS_GRANT_ID` | provider grant scoping API calls | unset |
//! | `COPILOT_DEFAULT_DURATION_MINUTES` | length of events with no end | `60` |
//!
//! `COPILOT_OFFSET` and `COPILOT_TIMEZONE` are mutually exclusive unless an
//! explicit offset is passed to [`SchedulerConfig::load`]. Variables set in
//! the process environment win over the same keys in a `.env` file.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, SchedulerError};
use crate::gateway::CalendarId;
use crate::normalize::{Timestamp, UtcOffset};
use crate::scheduler::DEFAULT_DURATION_SECS;

pub const ENV_OFFSET: &str = "COPILOT_OFFSET";
pub const ENV_TIMEZONE: &str = "COPILOT_TIMEZONE";
pub const ENV_CALENDAR_ID: &str = "NYLAS_CALENDAR_ID";
pub const ENV_GRANT_ID: &str = "NYLAS_GRANT_ID";
pub const ENV_DEFAULT_DURATION: &str = "COPILOT_DEFAULT_DURATION_MINUTES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub offset: UtcOffset,
    pub calendar_id: CalendarId,
    pub grant_id: Option<String>,
    pub default_duration_secs: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            offset: UtcOffset::IST,
            calendar_id: CalendarId::from("primary"),
            grant_id: None,
            default_duration_secs: DEFAULT_DURATION_SECS,
        }
    }
}

impl SchedulerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::load(None, None)
    }

    /// Load from the process environment, falling back to a `.env`-style
    /// file for keys the environment does not set.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(Some(path.as_ref()), None)
    }

    /// Load from the process environment and an optional `.env` file.
    ///
    /// An `offset` given here wins over `COPILOT_OFFSET` and
    /// `COPILOT_TIMEZONE`, which are then not read at all.
    pub fn load(env_file: Option<&Path>, offset: Option<UtcOffset>) -> Result<Self> {
        let file = match env_file {
            Some(path) => {
                let iter = dotenvy::from_path_iter(path).map_err(|e| {
                    SchedulerError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                collect_env(iter)?
            }
            None => HashMap::new(),
        };
        let lookup = |key: &str| std::env::var(key).ok().or_else(|| file.get(key).cloned());
        let now = chrono::Utc::now();
        match offset {
            Some(offset) => Self::from_lookup_with_offset(lookup, offset, now),
            None => Self::from_lookup(lookup, now),
        }
    }

    /// [`SchedulerConfig::from_lookup`] with a fixed offset; the offset
    /// variables are ignored.
    pub fn from_lookup_with_offset(
        lookup: impl Fn(&str) -> Option<String>,
        offset: UtcOffset,
        now: Timestamp,
    ) -> Result<Self> {
        let mut config = Self::from_lookup(
            |key| match key {
                ENV_OFFSET | ENV_TIMEZONE => None,
                _ => lookup(key),
            },
            now,
        )?;
        config.offset = offset;
        Ok(config)
    }

    /// Load from an arbitrary key lookup. `now` fixes the offset of
    /// `COPILOT_TIMEZONE`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, now: Timestamp) -> Result<Self> {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        match (non_empty(ENV_OFFSET), non_empty(ENV_TIMEZONE)) {
            (Some(_), Some(_)) => {
                return Err(SchedulerError::Config(format!(
                    "set either {ENV_OFFSET} or {ENV_TIMEZONE}, not both"
                )));
            }
            (Some(offset), None) => {
                config.offset = offset
                    .parse()
                    .map_err(|e| SchedulerError::Config(format!("{ENV_OFFSET}: {e}")))?;
            }
            (None, Some(zone)) => config.offset = UtcOffset::from_zone(zone.trim(), now)?,
            (None, None) => {}
        }

        if let Some(id) = non_empty(ENV_CALENDAR_ID) {
            config.calendar_id = CalendarId(id.trim().to_string());
        }
        config.grant_id = non_empty(ENV_GRANT_ID).map(|g| g.trim().to_string());

        if let Some(minutes) = non_empty(ENV_DEFAULT_DURATION) {
            let minutes: i64 = minutes.trim().parse().map_err(|_| {
                SchedulerError::Config(format!("{ENV_DEFAULT_DURATION} is not a number: '{minutes}'"))
            })?;
            if minutes <= 0 {
                return Err(SchedulerError::Config(format!(
                    "{ENV_DEFAULT_DURATION} must be positive, got {minutes}"
                )));
            }
            config.default_duration_secs = minutes * 60;
        }

        tracing::debug!(
            offset = %config.offset,
            calendar = %config.calendar_id,
            default_duration_secs = config.default_duration_secs,
            "loaded scheduler config"
        );
        Ok(config)
    }
}

/// Parse `.env` content: `KEY=VALUE` lines with optional `export`, quotes
/// and `#` comments.
pub fn parse_env_file(content: &str) -> Result<HashMap<String, String>> {
    collect_env(dotenvy::from_read_iter(content.as_bytes()))
}

fn collect_env<R: std::io::Read>(iter: dotenvy::Iter<R>) -> Result<HashMap<String, String>> {
    iter.map(|item| item.map_err(|e| SchedulerError::Config(format!("invalid .env file: {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::parse_iso;

    fn load(pairs: &[(&str, &str)]) -> Result<SchedulerConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let now = parse_iso("2026-01-15T12:00:00Z").unwrap();
        SchedulerConfig::from_lookup(|k| map.get(k).cloned(), now)
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.offset, UtcOffset::IST);
        assert_eq!(config.default_duration_secs, 3600);
    }

    #[test]
    fn test_explicit_values() {
        let config = load(&[
            (ENV_OFFSET, "-04:00"),
            (ENV_CALENDAR_ID, "team@example.com"),
            (ENV_GRANT_ID, "grant-123"),
            (ENV_DEFAULT_DURATION, "30"),
        ])
        .unwrap();
        assert_eq!(config.offset.to_string(), "-04:00");
        assert_eq!(config.calendar_id, CalendarId::from("team@example.com"));
        assert_eq!(config.grant_id.as_deref(), Some("grant-123"));
        assert_eq!(config.default_duration_secs, 1800);
    }

    #[test]
    fn test_timezone_resolves_to_offset() {
        let config = load(&[(ENV_TIMEZONE, "America/New_York")]).unwrap();
        assert_eq!(config.offset.to_string(), "-05:00");
    }

    #[test]
    fn test_offset_and_timezone_conflict() {
        let err = load(&[(ENV_OFFSET, "+05:30"), (ENV_TIMEZONE, "Asia/Kolkata")]).unwrap_err();
        assert!(matches!(err, SchedulerError::Config(_)));
    }

    #[test]
    fn test_explicit_offset_wins_over_environment() {
        let map: HashMap<String, String> = [
            (ENV_OFFSET, "+05:30"),
            (ENV_TIMEZONE, "Asia/Kolkata"),
            (ENV_CALENDAR_ID, "team"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let now = parse_iso("2026-01-15T12:00:00Z").unwrap();
        let config =
            SchedulerConfig::from_lookup_with_offset(|k| map.get(k).cloned(), UtcOffset::UTC, now)
                .unwrap();
        assert_eq!(config.offset, UtcOffset::UTC);
        assert_eq!(config.calendar_id, CalendarId::from("team"));
        assert!(SchedulerConfig::from_lookup(|k| map.get(k).cloned(), now).is_err());
    }

    #[test]
    fn test_bad_values() {
        assert!(load(&[(ENV_OFFSET, "IST")]).is_err());
        assert!(load(&[(ENV_DEFAULT_DURATION, "ten")]).is_err());
        assert!(load(&[(ENV_DEFAULT_DURATION, "0")]).is_err());
        assert!(load(&[(ENV_TIMEZONE, "Nowhere/Special")]).is_err());
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = load(&[(ENV_OFFSET, "  "), (ENV_GRANT_ID, "")]).unwrap();
        assert_eq!(config.offset, UtcOffset::IST);
        assert_eq!(config.grant_id, None);
    }

    #[test]
    fn test_parse_env_file() {
        let values = parse_env_file(
            "# provider\nexport NYLAS_GRANT_ID=\"abc\"\n\nNYLAS_CALENDAR_ID='me@example.com'\nCOPILOT_OFFSET=+05:30\n",
        )
        .unwrap();
        assert_eq!(values["NYLAS_GRANT_ID"], "abc");
        assert_eq!(values["NYLAS_CALENDAR_ID"], "me@example.com");
        assert_eq!(values["COPILOT_OFFSET"], "+05:30");
        assert!(parse_env_file("not a pair").is_err());
    }

    #[test]
    fn test_env_file_inline_comment() {
        let values =
            parse_env_file("COPILOT_OFFSET=+05:30 # IST\nCOPILOT_DEFAULT_DURATION_MINUTES=45\n")
                .unwrap();
        assert_eq!(values["COPILOT_OFFSET"], "+05:30");
        let config = SchedulerConfig::from_lookup(
            |k| values.get(k).cloned(),
            parse_iso("2026-01-15T12:00:00Z").unwrap(),
        )
        .unwrap();
        assert_eq!(config.offset, UtcOffset::IST);
        assert_eq!(config.default_duration_secs, 2700);
    }

    #[test]
    fn test_from_env_file_reads_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.env");
        std::fs::write(&path, "COPILOT_SCHEDULER_UNUSED=1 # ignored\n").unwrap();
        assert!(SchedulerConfig::from_env_file(&path).is_ok());
        assert!(SchedulerConfig::from_env_file(dir.path().join("missing.env")).is_err());
    }
}
