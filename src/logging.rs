use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::AppPaths;
use crate::error::MigrationError;

pub const LOG_ENV: &str = "GAMEHOST_LOG";
pub const LOG_FILE: &str = "events.log";

/// Console plus `<data>/logs/events.log`.
///
/// Keep the returned guard alive for as long as file logging is wanted. A
/// second call leaves the first subscriber in place.
pub fn init_logging(paths: &AppPaths, debug: bool) -> Result<WorkerGuard, MigrationError> {
    let logs_dir = paths.logs_dir();
    fs::create_dir_all(&logs_dir)?;

    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let appender = tracing_appender::rolling::never(&logs_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_target(true);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer);

    if tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("logging already initialised");
    }

    Ok(guard)
}
