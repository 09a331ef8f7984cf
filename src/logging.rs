//! Tracing setup for GeoZone.
//!
//! Installs a global subscriber writing to a per-session log file and to
//! stdout. Verbosity follows the `RUST_LOG` environment variable and
//! defaults to `info`. Library code only emits through `tracing` macros;
//! embedding applications that install their own subscriber should not call
//! into this module at all.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive.
///
/// Dropping the guard flushes buffered log lines and closes the file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Installs the global tracing subscriber.
///
/// The log file is truncated at startup, so each run starts with an empty
/// log. File output goes through a non-blocking writer and carries no ANSI
/// codes; the stdout layer keeps them for terminals.
///
/// Hold on to the returned [`LoggingGuard`] for as long as logging should
/// stay active.
///
/// # Errors
///
/// Fails when `log_dir` cannot be created or the file inside it cannot be
/// truncated.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;

    // Truncate whatever the previous session left behind.
    let log_path = Path::new(log_dir).join(log_file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Default directory for log files.
pub fn default_log_dir() -> &'static str {
    "logs"
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    "geozone.log"
}
