//! Console and log-file output
//!
//! Each tool writes the same timestamped lines to stdout and appends them to
//! its own file under `logs/`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::{CoreError, Result};

/// Overrides the default filter, e.g. `APK2AAB_LOG=debug`
pub const LOG_ENV: &str = "APK2AAB_LOG";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `[2026-01-31 14:05:09] message`, with `warning:`/`error:` prefixes
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampedLine;

impl<S, N> FormatEvent<S, N> for TimestampedLine
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        write!(writer, "[{}] ", chrono::Local::now().format(TIMESTAMP_FORMAT))?;
        match *event.metadata().level() {
            Level::ERROR => writer.write_str("error: ")?,
            Level::WARN => writer.write_str("warning: ")?,
            _ => {}
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber: stdout plus `<logs_dir>/<file_name>`.
pub fn init(logs_dir: &Path, file_name: &str, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(logs_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(file_name))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(TimestampedLine)
        .with_writer(std::io::stdout);

    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(TimestampedLine)
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| CoreError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{info, warn};

    #[test]
    fn test_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversion.log");
        let file = OpenOptions::new().create(true).append(true).open(&path).unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(TimestampedLine)
            .with_writer(Mutex::new(file))
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            info!("Checking requirements...");
            warn!("AAB created but signing failed");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        // "[YYYY-MM-DD HH:MM:SS] " is 22 characters
        assert!(lines[0].starts_with('['));
        assert_eq!(&lines[0][20..22], "] ");
        assert!(chrono::NaiveDateTime::parse_from_str(&lines[0][1..20], TIMESTAMP_FORMAT).is_ok());
        assert!(lines[0].ends_with("] Checking requirements..."));
        assert!(lines[1].ends_with("] warning: AAB created but signing failed"));
    }
}
