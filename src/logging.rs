//! Log output in the host's line format
//!
//! NZBGet reads a script's standard output line by line and assigns the
//! message kind from a bracketed prefix. Tracing levels map onto those kinds:
//!
//! | Level          | Prefix      |
//! |----------------|-------------|
//! | `ERROR`        | `[ERROR]`   |
//! | `WARN`         | `[WARNING]` |
//! | `INFO`         | `[INFO]`    |
//! | `DEBUG`/`TRACE`| `[DETAIL]`  |
//!
//! Multi-line messages get the prefix on every line so none of them is lost
//! to the host's default kind.

use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "fake_detector=debug,warn";

/// Host message prefix for a tracing level
#[must_use]
pub fn level_prefix(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "[ERROR]",
        Level::WARN => "[WARNING]",
        Level::INFO => "[INFO]",
        _ => "[DETAIL]",
    }
}

/// Event formatter writing `[KIND] message` lines
#[derive(Clone, Copy, Debug, Default)]
pub struct HostLogFormat;

impl<S, N> FormatEvent<S, N> for HostLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let prefix = level_prefix(event.metadata().level());

        let mut message = String::new();
        ctx.field_format()
            .format_fields(Writer::new(&mut message), event)?;

        if message.is_empty() {
            return writeln!(writer, "{}", prefix);
        }
        for line in message.lines() {
            writeln!(writer, "{} {}", prefix, line)?;
        }
        Ok(())
    }
}

/// Install the global subscriber writing host-formatted lines to stdout
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Calling this twice is harmless.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .with_env_filter(filter)
        .event_format(HostLogFormat)
        .try_init();
}
