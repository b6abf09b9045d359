//! Serialized command path for the recording session.
//!
//! User actions, host interruptions, lifecycle signals and device events all
//! reach the [`RecordingSession`] through one `select!` loop, so no two
//! operations ever overlap. The tick timer only exists while Recording and is
//! dropped in the same loop iteration the session leaves that state.

use crate::{
    CoreResult, RecorderError, SessionState,
    audio::DeviceEvent,
    session::{Interruption, LifecycleSignal, RecordingSession, SessionEvent, SessionStatus},
};

use std::{panic::Location, path::PathBuf, time::Duration};

use error_location::ErrorLocation;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::{Instant, Interval, MissedTickBehavior, interval_at},
};
use tracing::{debug, error, info, instrument, warn};

/// Interval between duration/level updates.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

const COMMAND_CAPACITY: usize = 32;

type Reply<T> = oneshot::Sender<CoreResult<T>>;

enum Command {
    Start(Reply<()>),
    Pause(Reply<()>),
    Resume(Reply<()>),
    Stop(Reply<Option<PathBuf>>),
    Discard(Reply<()>),
    Interruption(Interruption, Reply<()>),
    Lifecycle(LifecycleSignal, Reply<()>),
    Status(oneshot::Sender<SessionStatus>),
    Shutdown(oneshot::Sender<()>),
}

/// Owns the session and runs its command loop.
pub struct SessionDriver {
    session: RecordingSession,
    commands: mpsc::Receiver<Command>,
    device_events: mpsc::UnboundedReceiver<DeviceEvent>,
    tick_interval: Duration,
}

/// Cloneable front door to a running [`SessionDriver`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionDriver {
    /// Wraps `session`. Device notifications arrive on `device_events`.
    pub fn new(
        session: RecordingSession,
        device_events: mpsc::UnboundedReceiver<DeviceEvent>,
        tick_interval: Duration,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let handle = SessionHandle {
            commands: command_tx,
            events: session.event_sender(),
        };

        let driver = Self {
            session,
            commands: command_rx,
            device_events,
            tick_interval,
        };

        (driver, handle)
    }

    /// Runs until [`SessionHandle::shutdown`] or until every handle is dropped.
    ///
    /// When the handles disappear without a shutdown, the current snapshot is
    /// written so the recording can be restored on the next launch.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("Session driver started");

        let mut ticker: Option<Interval> = None;

        loop {
            self.sync_ticker(&mut ticker);

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Shutdown(ack)) => {
                            let _ = ack.send(());
                            break;
                        }
                        Some(command) => self.dispatch(command),
                        None => {
                            if let Err(e) = self.session.save_state() {
                                warn!(error = ?e, "Failed to save session state on close");
                            }
                            break;
                        }
                    }
                }

                Some(event) = self.device_events.recv() => {
                    if let Err(e) = self.session.handle_device_event(event) {
                        error!(error = ?e, "Failed to handle device event");
                    }
                }

                _ = next_tick(&mut ticker) => {
                    self.session.tick();
                }
            }
        }

        info!("Session driver stopped");
    }

    fn sync_ticker(&self, ticker: &mut Option<Interval>) {
        let recording = self.session.state() == SessionState::Recording;

        if recording && ticker.is_none() {
            let mut interval =
                interval_at(Instant::now() + self.tick_interval, self.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            *ticker = Some(interval);
            debug!("Tick timer started");
        } else if !recording && ticker.is_some() {
            *ticker = None;
            debug!("Tick timer cancelled");
        }
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let _ = reply.send(self.session.start());
            }
            Command::Pause(reply) => {
                let _ = reply.send(self.session.pause());
            }
            Command::Resume(reply) => {
                let _ = reply.send(self.session.resume());
            }
            Command::Stop(reply) => {
                let _ = reply.send(self.session.stop());
            }
            Command::Discard(reply) => {
                let _ = reply.send(self.session.discard());
            }
            Command::Interruption(interruption, reply) => {
                let _ = reply.send(self.session.handle_interruption(interruption));
            }
            Command::Lifecycle(signal, reply) => {
                let _ = reply.send(self.session.handle_lifecycle(signal));
            }
            Command::Status(reply) => {
                let _ = reply.send(self.session.status());
            }
            Command::Shutdown(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl SessionHandle {
    /// Subscribes to session notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// See [`RecordingSession::start`].
    pub async fn start(&self) -> CoreResult<()> {
        self.request(Command::Start).await?
    }

    /// See [`RecordingSession::pause`].
    pub async fn pause(&self) -> CoreResult<()> {
        self.request(Command::Pause).await?
    }

    /// See [`RecordingSession::resume`].
    pub async fn resume(&self) -> CoreResult<()> {
        self.request(Command::Resume).await?
    }

    /// See [`RecordingSession::stop`].
    pub async fn stop(&self) -> CoreResult<Option<PathBuf>> {
        self.request(Command::Stop).await?
    }

    /// See [`RecordingSession::discard`].
    pub async fn discard(&self) -> CoreResult<()> {
        self.request(Command::Discard).await?
    }

    /// See [`RecordingSession::handle_interruption`].
    pub async fn interruption(&self, interruption: Interruption) -> CoreResult<()> {
        self.request(|reply| Command::Interruption(interruption, reply))
            .await?
    }

    /// See [`RecordingSession::handle_lifecycle`].
    pub async fn lifecycle(&self, signal: LifecycleSignal) -> CoreResult<()> {
        self.request(|reply| Command::Lifecycle(signal, reply))
            .await?
    }

    /// Current session status.
    pub async fn status(&self) -> CoreResult<SessionStatus> {
        self.request(Command::Status).await
    }

    /// Stops the driver loop. The session itself is left as is.
    pub async fn shutdown(&self) -> CoreResult<()> {
        self.request(Command::Shutdown).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> CoreResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|e| RecorderError::DriverUnavailable {
                reason: format!("Failed to send command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        reply_rx
            .await
            .map_err(|e| RecorderError::DriverUnavailable {
                reason: format!("Driver dropped the reply: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
