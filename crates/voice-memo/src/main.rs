//! Voice-Memo: record, pause and organize voice memos from the console.

mod app;
mod app_command;
mod config;
mod console_handler;
mod display;
mod error;
mod logging;
#[cfg(test)]
mod tests;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    console_handler::ConsoleHandler,
    error::{AppError, Result as AppResult},
};

use crate::config::Config;

use voice_memo_core::{
    CpalCaptureBackend, FileKeyValueStore, FsStorageGateway, RecordingCatalog, RecordingSession,
    SessionDriver, SessionPersistence, StorageGateway, SystemClock,
};

use std::{path::Path, sync::Arc, time::Duration};

use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument};

const COMMAND_CAPACITY: usize = 32;
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Application entry point.
fn main() {
    let proj_dirs = match config::project_dirs() {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to locate application directories: {}", e);
            std::process::exit(1);
        }
    };

    // Held until exit so buffered log lines are flushed.
    let _log_guard = match logging::init(&config::log_dir(&proj_dirs)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    let result = rt.block_on(run(config, &config::state_dir(&proj_dirs)));

    // Stdin is read on a blocking thread that cannot be interrupted.
    rt.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    if let Err(e) = result {
        error!(error = ?e, "Voice-Memo exited with an error");
        std::process::exit(1);
    }
}

#[instrument(skip(config))]
async fn run(config: Config, state_dir: &Path) -> AppResult<()> {
    let storage: Arc<dyn StorageGateway> = Arc::new(FsStorageGateway::new(
        &config.storage.recordings_dir,
        config.audio_extension(),
    )?);
    let persistence = SessionPersistence::new(Box::new(FileKeyValueStore::new(state_dir)?));

    let (device_tx, device_rx) = mpsc::unbounded_channel();
    let backend = CpalCaptureBackend::new(config.audio.selected_device.clone(), device_tx);

    let session = RecordingSession::new(
        Box::new(backend),
        Arc::clone(&storage),
        persistence,
        Arc::new(SystemClock),
        config.session_options(),
    );
    let (driver, session_handle) =
        SessionDriver::new(session, device_rx, config.session.tick_interval());
    let driver_task = tokio::spawn(driver.run());

    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let console_handler = ConsoleHandler::new(command_tx);
    let app = App {
        session: session_handle,
        catalog: RecordingCatalog::new(Arc::clone(&storage)),
        storage,
        command_rx,
        shutdown_tx,
    };

    info!(recordings_dir = ?config.storage.recordings_dir, "Components ready");

    tokio::join!(
        async {
            if let Err(e) = console_handler.run(shutdown_rx).await {
                error!(error = ?e, "Console handler error");
            }
        },
        async {
            if let Err(e) = app.run().await {
                error!(error = ?e, "App error");
            }
        }
    );

    if let Err(e) = driver_task.await {
        error!(error = ?e, "Session driver task panicked");
    }

    Ok(())
}
