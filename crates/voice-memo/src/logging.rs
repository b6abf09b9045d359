//! Tracing setup: warnings to the terminal, everything else to a daily-rotated file.

use crate::{AppError, AppResult};

use std::{fs, panic::Location, path::Path};

use error_location::ErrorLocation;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "voice-memo.log";
const DEFAULT_FILE_FILTER: &str = "voice_memo=debug,voice_memo_core=debug";

/// Installs the global subscriber.
///
/// The file layer honors `RUST_LOG`. The returned guard flushes the file
/// writer when dropped and must be held for the lifetime of the program.
#[track_caller]
pub fn init(log_dir: &Path) -> AppResult<WorkerGuard> {
    fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILE_FILTER));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .try_init()
        .map_err(|e| AppError::LoggingError {
            reason: format!("Failed to install subscriber: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    tracing::debug!(log_dir = ?log_dir, "Logging initialized");

    Ok(guard)
}
