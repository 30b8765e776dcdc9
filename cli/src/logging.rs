use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use taskmill_core::config::LogConfig;
use taskmill_core::error::CliError;
use taskmill_core::report::ScopedLineFormat;
use taskmill_core::util::expand_path;
use taskmill_core::util::time::file_stamp;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

const DEFAULT_FILENAME: &str = "run-{timestamp}.log";

/// Installs the console subscriber and, when `log.dir` is set, an appending
/// file writer. Returns the log file path, if any.
pub fn init_tracing(log: &LogConfig) -> Result<Option<PathBuf>, CliError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(log.level.trim())
            .map_err(|e| CliError::Logging(format!("invalid log level '{}': {e}", log.level)))?,
    };

    let mut log_path = None;
    let mut maybe_writer = None;

    let dir = log.dir.trim();
    if !dir.is_empty() {
        let dir = PathBuf::from(expand_path(dir));
        std::fs::create_dir_all(&dir)
            .map_err(|e| CliError::Logging(format!("create log dir {} failed: {e}", dir.display())))?;
        let file_name = log_file_name(&log.filename_pattern, Local::now());
        log_path = Some(dir.join(&file_name));

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        if let Ok(mut slot) = LOG_GUARD.lock() {
            *slot = Some(guard);
        }
        maybe_writer = Some(non_blocking);
    }

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .event_format(ScopedLineFormat);

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
            .event_format(ScopedLineFormat)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;

    Ok(log_path)
}

/// Drops the file writer guard so buffered lines reach disk before exit.
pub fn flush() {
    if let Ok(mut slot) = LOG_GUARD.lock() {
        slot.take();
    }
}

pub fn log_file_name(pattern: &str, now: DateTime<Local>) -> String {
    let pattern = match pattern.trim() {
        "" => DEFAULT_FILENAME,
        p => p,
    };
    pattern.replace("{timestamp}", &file_stamp(now))
}
