use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::process;
use std::sync::Mutex;

use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::types::{LogLevel, LogMode};

/// Events on this target are rendered as `CRI` instead of `ERR`.
pub const CRITICAL_TARGET: &str = "backuputil::critical";

const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Logs at the critical level: an `ERROR` event on [`CRITICAL_TARGET`].
#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        ::tracing::error!(target: $crate::logging::CRITICAL_TARGET, $($arg)+)
    };
}

/// `[LVL] [MM/DD/YYYY HH:MM:SS AM] [pid] message`
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
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
        let meta = event.metadata();
        write!(
            writer,
            "[{}] [{}] [{}] ",
            level_label(meta.level(), meta.target()),
            Local::now().format(TIMESTAMP_FORMAT),
            process::id()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_label(level: &Level, target: &str) -> &'static str {
    if target == CRITICAL_TARGET {
        return "CRI";
    }
    match *level {
        Level::ERROR => "ERR",
        Level::WARN => "WAR",
        Level::INFO => "INF",
        Level::DEBUG => "DEB",
        Level::TRACE => "TRA",
    }
}

/// Installs the global subscriber writing to `path`. An empty path leaves
/// logging disabled.
pub fn init(path: &str, level: LogLevel, mode: LogMode) -> io::Result<()> {
    if path.is_empty() {
        return Ok(());
    }
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        LogMode::Append => options.append(true),
        LogMode::Overwrite => options.write(true).truncate(true),
    };
    let file = options.open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.as_str()))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .event_format(LineFormat)
        .try_init()
        .map_err(io::Error::other)
}
