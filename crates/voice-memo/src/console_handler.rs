//! Console input handler.
//!
//! Reads one command per line from stdin and forwards parsed commands to the
//! main application over an async channel.

use crate::{AppCommand, AppError, AppResult};

use std::panic::Location;

use error_location::ErrorLocation;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
};
use tracing::{debug, info, instrument, warn};

/// Turns console lines into [`AppCommand`]s.
pub struct ConsoleHandler {
    command_tx: mpsc::Sender<AppCommand>,
}

impl ConsoleHandler {
    /// Create a handler forwarding to `command_tx`.
    pub fn new(command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { command_tx }
    }

    /// Run the console loop on stdin until shutdown or end of input.
    pub async fn run(&self, shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        self.run_with(BufReader::new(tokio::io::stdin()), shutdown_rx)
            .await
    }

    /// Run the console loop on any line source.
    ///
    /// End of input is treated as a quit request.
    #[instrument(skip_all)]
    pub async fn run_with<R>(&self, input: R, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Console handler shutting down");
                    break;
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => self.handle_line(&line).await?,
                        None => {
                            info!("Console input closed");
                            self.send(AppCommand::Quit).await?;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn handle_line(&self, line: &str) -> AppResult<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        match line.parse::<AppCommand>() {
            Ok(command) => {
                debug!(command = ?command, "Console command parsed");
                self.send(command).await
            }
            Err(AppError::InvalidCommand { reason, .. }) => {
                println!("{}", reason);
                Ok(())
            }
            Err(e) => {
                warn!(error = ?e, "Failed to parse console command");
                Ok(())
            }
        }
    }

    async fn send(&self, command: AppCommand) -> AppResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send console command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
