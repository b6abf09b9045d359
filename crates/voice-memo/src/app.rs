use crate::{
    AppCommand, AppError, AppResult,
    app_command::HELP,
    display::{format_bytes, format_elapsed, level_bar},
};

use voice_memo_core::{
    Interruption, LifecycleSignal, RecorderError, RecordingCatalog, SessionEvent, SessionHandle,
    SessionState, StorageGateway,
};

use std::{io::Write, sync::Arc};

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, instrument, warn};

/// Main application state.
///
/// Owns the catalog and talks to the session only through its
/// [`SessionHandle`]; every session operation is serialized by the driver.
pub struct App {
    pub(crate) session: SessionHandle,
    pub(crate) catalog: RecordingCatalog,
    pub(crate) storage: Arc<dyn StorageGateway>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl App {
    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Voice-Memo starting");

        let mut events = self.session.subscribe();

        if let Err(e) = self.catalog.refresh() {
            error!(error = ?e, "Failed to load recordings");
        }
        self.greet().await;

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => info!("Interrupt signal received"),
                        Err(e) => error!(error = ?e, "Failed to listen for interrupt signal"),
                    }
                    break;
                }

                Some(cmd) = self.command_rx.recv() => {
                    if cmd == AppCommand::Quit {
                        info!("Shutdown requested");
                        break;
                    }
                    if let Err(e) = self.handle_command(cmd).await {
                        report(&e);
                    }
                }

                event = events.recv() => {
                    match event {
                        Ok(event) => self.handle_session_event(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Session events lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("Session event stream closed");
                            break;
                        }
                    }
                }

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        // Anything still recording is finalized before exit.
        match self.session.lifecycle(LifecycleSignal::Terminate).await {
            Ok(()) => {
                while let Ok(event) = events.try_recv() {
                    self.handle_session_event(event);
                }
            }
            Err(e) => error!(error = ?e, "Failed to finalize recording on exit"),
        }

        if let Err(e) = self.session.shutdown().await {
            warn!(error = ?e, "Session driver already stopped");
        }

        let _ = self.shutdown_tx.send(true);
        info!("Voice-Memo shut down successfully");

        Ok(())
    }

    async fn greet(&self) {
        println!("Voice-Memo. Type `help` for commands.");

        match self.session.status().await {
            Ok(status) if status.state == SessionState::Paused => println!(
                "Restored a paused recording at {}. Type `resume` to continue or `stop` to save it.",
                format_elapsed(status.elapsed)
            ),
            Ok(_) => {}
            Err(e) => error!(error = ?e, "Failed to read session status"),
        }
    }

    #[instrument(skip(self))]
    async fn handle_command(&mut self, cmd: AppCommand) -> AppResult<()> {
        match cmd {
            AppCommand::Start => {
                self.session.start().await?;
                println!("Recording. Type `pause` or `stop`.");
            }
            AppCommand::Pause => self.session.pause().await?,
            AppCommand::Resume => self.session.resume().await?,
            AppCommand::Stop => {
                if self.session.stop().await?.is_none() {
                    println!("Nothing is being recorded.");
                }
            }
            AppCommand::Discard => self.session.discard().await?,
            AppCommand::Interrupt => self.session.interruption(Interruption::Began).await?,
            AppCommand::InterruptEnd { resume } => {
                self.session
                    .interruption(Interruption::Ended {
                        should_resume: resume,
                    })
                    .await?
            }
            AppCommand::Background => {
                self.session
                    .lifecycle(LifecycleSignal::EnterBackground)
                    .await?;
                println!("Session state saved.");
            }
            AppCommand::Status => {
                let status = self.session.status().await?;
                match status.file_path {
                    Some(path) => println!(
                        "{} {} {}",
                        status.state,
                        format_elapsed(status.elapsed),
                        path.display()
                    ),
                    None => println!("{}", status.state),
                }
            }
            AppCommand::List => {
                self.catalog.refresh()?;
                self.print_catalog();
            }
            AppCommand::Rename { index, name } => {
                let entry = self.catalog.rename(index, &name)?;
                println!("Renamed to {}", entry.display_name);
            }
            AppCommand::Delete { index } => {
                let removed = self.catalog.delete(index)?;
                println!("Deleted {}", removed.display_name);
            }
            AppCommand::Space => {
                let available = self.storage.available_free_space()?;
                println!(
                    "{} free in {}",
                    format_bytes(available),
                    self.storage.recordings_dir().display()
                );
            }
            AppCommand::Help => println!("{}", HELP),
            AppCommand::Quit => {}
        }

        Ok(())
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StateChanged { from, to } => {
                if from == SessionState::Recording {
                    // Ends the in-place meter line.
                    println!();
                }
                println!("[{}]", to);
            }
            SessionEvent::Tick { elapsed, level } => {
                print!("\r{} {} {:>7.1} dB", format_elapsed(elapsed), level_bar(level), level);
                let _ = std::io::stdout().flush();
            }
            SessionEvent::Finalized { path, duration } => {
                println!("Saved {} ({})", path.display(), format_elapsed(duration));
                if let Err(e) = self.catalog.refresh() {
                    error!(error = ?e, "Failed to refresh recordings");
                }
            }
            SessionEvent::Discarded { path } => println!("Discarded {}", path.display()),
            SessionEvent::LowDiskSpace {
                available,
                threshold,
            } => println!(
                "Warning: only {} free (threshold {})",
                format_bytes(available),
                format_bytes(threshold)
            ),
            SessionEvent::DeviceFailed => {
                println!("The microphone stopped unexpectedly; the recording was saved.")
            }
        }
    }

    fn print_catalog(&self) {
        if self.catalog.is_empty() {
            println!("No recordings yet.");
            return;
        }

        for (number, entry) in self.catalog.entries().iter().enumerate() {
            match entry.created_at {
                Some(created) => println!(
                    "{:>3}. {}  ({})",
                    number + 1,
                    entry.display_name,
                    created.format("%Y-%m-%d %H:%M:%S")
                ),
                None => println!("{:>3}. {}", number + 1, entry.display_name),
            }
        }
    }
}

/// Illegal transitions are user mistakes; everything else is a real failure.
fn report(err: &AppError) {
    match err {
        AppError::Recorder {
            source: RecorderError::IllegalTransition {
                operation, state, ..
            },
            ..
        } => {
            warn!(error = ?err, "Rejected command");
            println!("Cannot {} while {}.", operation, state);
        }
        AppError::Recorder { source, .. } => {
            error!(error = ?err, "Command failed");
            println!("Error: {}", source);
        }
        other => {
            error!(error = ?other, "Command failed");
            println!("Error: {}", other);
        }
    }
}
