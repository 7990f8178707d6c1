//! copilot-sched: normalize datetimes and schedule conflict-free events
//! against a local JSON calendar.
//!
//! Every command prints JSON on stdout. Exit status is 0 on success, 1 on
//! error, and 2 when the requested slot is taken (`check`, `schedule`).

mod store;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use copilot_scheduler::{
    find_free_slots, from_unix, parse_iso, resolve, to_iso, to_unix, CalendarId, EventInterval,
    SchedulerConfig, SchedulerContext, SchedulerError, SystemClock, UtcOffset,
};

use store::{FileCalendar, FileMailbox};

/// How far ahead `schedule` looks for an alternative slot after a conflict.
const SUGGESTION_HORIZON_SECS: i64 = 7 * 86_400;

#[derive(Parser)]
#[command(name = "copilot-sched")]
#[command(about = "Deterministic datetime normalization and conflict-free scheduling")]
#[command(version)]
struct Cli {
    /// Operator UTC offset (±HH:MM); COPILOT_OFFSET and COPILOT_TIMEZONE are
    /// ignored when given
    #[arg(long, global = true)]
    offset: Option<String>,

    /// Fallback settings for variables the environment does not set
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// JSON calendar file
    #[arg(long, global = true, env = "COPILOT_CALENDAR_FILE")]
    calendar: Option<PathBuf>,

    /// Calendar within the file
    #[arg(long, global = true, env = "NYLAS_CALENDAR_ID")]
    calendar_id: Option<String>,

    /// JSON array of messages
    #[arg(long, global = true, env = "COPILOT_MAILBOX_FILE")]
    mailbox: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current date and time in every supported representation
    Now,

    /// Convert an absolute ISO-8601 datetime to Unix seconds
    ToUnix {
        /// e.g. 2025-06-21T14:30:00+05:30
        datetime: String,
    },

    /// Convert Unix seconds to YYYY-MM-DDTHH:MM:SS±HH:MM
    ToIso {
        #[arg(allow_hyphen_values = true)]
        seconds: i64,
    },

    /// Resolve a relative expression ("tomorrow at 2pm") to an absolute datetime
    Resolve {
        expression: String,

        /// Anchor instant instead of the system clock
        #[arg(long)]
        at: Option<String>,
    },

    /// Check a candidate interval against the calendar without creating anything
    Check {
        /// ISO datetime or expression ("tomorrow at 2pm")
        #[arg(long)]
        start: String,

        /// Defaults to start + default duration
        #[arg(long)]
        end: Option<String>,
    },

    /// List free slots between two datetimes or expressions
    Free {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Shortest slot worth reporting
        #[arg(long, default_value = "30")]
        min_minutes: i64,
    },

    /// Create an event if the slot is free
    Schedule {
        #[arg(long)]
        title: String,

        /// ISO datetime or expression ("next friday at 10am")
        #[arg(long)]
        start: String,

        /// Defaults to start + default duration
        #[arg(long)]
        end: Option<String>,
    },

    /// List the most recent messages from the mailbox file
    Emails {
        /// Number of messages, clamped to 1..=50
        #[arg(short = 'n', long, allow_hyphen_values = true)]
        limit: Option<i64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<SchedulerConfig> {
    let offset = cli
        .offset
        .as_deref()
        .map(|offset| {
            offset
                .parse::<UtcOffset>()
                .with_context(|| format!("invalid --offset '{offset}'"))
        })
        .transpose()?;
    let mut config = SchedulerConfig::load(cli.env_file.as_deref(), offset)?;
    if let Some(id) = &cli.calendar_id {
        config.calendar_id = CalendarId::from(id.as_str());
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let offset = config.offset;
    let ctx = SchedulerContext::new(
        config,
        SystemClock,
        FileCalendar::new(cli.calendar.clone()),
        FileMailbox::new(cli.mailbox.clone()),
    )?;

    match cli.command {
        Command::Now => print_json(&ctx.now())?,
        Command::ToUnix { datetime } => {
            let ts = parse_iso(&datetime)?;
            print_json(&json!({
                "unix_seconds": to_unix(ts),
                "iso": to_iso(ts, offset),
            }))?;
        }
        Command::ToIso { seconds } => {
            print_json(&json!({
                "unix_seconds": seconds,
                "iso": to_iso(from_unix(seconds)?, offset),
            }))?;
        }
        Command::Resolve { expression, at } => {
            let resolved = match at {
                Some(at) => {
                    let anchor = parse_iso(&at).context("invalid --at")?;
                    resolve(&expression, anchor, offset)?
                }
                None => ctx.resolve(&expression)?,
            };
            print_json(&resolved)?;
        }
        Command::Check { start, end } => {
            let candidate = ctx.candidate("candidate", &start, end.as_deref())?;
            let snapshot = ctx.scheduler().snapshot()?;
            let conflicts = snapshot.conflicts_with(&candidate);
            let taken = !conflicts.is_empty();
            print_json(&json!({
                "conflict": taken,
                "start": to_iso(from_unix(candidate.start())?, offset),
                "end": to_iso(from_unix(candidate.end())?, offset),
                "conflicts": conflicts,
            }))?;
            if taken {
                return Ok(ExitCode::from(2));
            }
        }
        Command::Free {
            from,
            to,
            min_minutes,
        } => {
            let window_start = ctx.resolve(&from)?.unix_seconds;
            let window_end = ctx.resolve(&to)?.unix_seconds;
            let snapshot = ctx.scheduler().snapshot()?;
            let slots = find_free_slots(
                window_start,
                window_end,
                snapshot.events(),
                min_minutes.saturating_mul(60),
            )?;
            let rendered = slots
                .iter()
                .map(|slot| -> Result<serde_json::Value> {
                    Ok(json!({
                        "start": to_iso(from_unix(slot.start)?, offset),
                        "end": to_iso(from_unix(slot.end)?, offset),
                        "minutes": slot.duration_seconds() / 60,
                    }))
                })
                .collect::<Result<Vec<_>>>()?;
            print_json(&rendered)?;
        }
        Command::Schedule { title, start, end } => {
            let wanted = ctx.candidate(&title, &start, end.as_deref())?;
            match ctx.scheduler().schedule_interval(&wanted) {
                Ok(confirmation) => print_json(&confirmation)?,
                Err(SchedulerError::Conflict(conflicts)) => {
                    print_json(&json!({
                        "status": "conflict",
                        "conflicts": conflicts,
                        "suggestion": suggestion(&ctx, &wanted, offset)?,
                    }))?;
                    return Ok(ExitCode::from(2));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Emails { limit } => print_json(&ctx.latest_emails(limit)?)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn suggestion(
    ctx: &SchedulerContext,
    wanted: &EventInterval,
    offset: UtcOffset,
) -> Result<Option<serde_json::Value>> {
    ctx.suggest_alternative(wanted, SUGGESTION_HORIZON_SECS)?
        .map(|slot| -> Result<_> {
            Ok(json!({
                "start": to_iso(from_unix(slot.start)?, offset),
                "end": to_iso(from_unix(slot.end)?, offset),
            }))
        })
        .transpose()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}
