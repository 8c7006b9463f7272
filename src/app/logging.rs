//! Logging setup
//!
//! Console output plus an optional daily rolling log file. The filter comes
//! from `RUST_LOG` when set, otherwise from the settings level.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::config::LoggingSettings;
use crate::error::{Error, Result};
use crate::helpers::{ensure_dir, get_or_create_data_dir, is_development};

const LOG_FILE_PREFIX: &str = "bambu-beacon.log";

fn default_level() -> &'static str {
    if is_development() { "debug" } else { "info" }
}

/// Build the env filter: `RUST_LOG` first, then the configured level
pub fn build_filter(settings: &LoggingSettings) -> EnvFilter {
    let fallback = settings.level.as_deref().unwrap_or(default_level());
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new(default_level()))
}

/// Directory for rolling log files, if file logging applies
pub fn log_directory(settings: &LoggingSettings) -> Result<Option<PathBuf>> {
    match settings.directory.as_deref().map(str::trim) {
        Some("") => Ok(None),
        Some(dir) => Ok(Some(PathBuf::from(dir))),
        None if is_development() => Ok(None),
        None => Ok(Some(get_or_create_data_dir()?.join("logs"))),
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init_logging(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_directory(settings)? {
        Some(dir) => {
            ensure_dir(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_timer(LocalTime::rfc_3339())
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(settings))
        .with(tracing_subscriber::fmt::layer().with_timer(LocalTime::rfc_3339()))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Invalid {
            message: format!("Logging already initialized: {e}"),
        })?;

    Ok(guard)
}
