use crate::{
    CoreResult, RecorderError, SessionState,
    audio::{AudioFormat, CaptureBackend, CaptureHandle, DeviceEvent, LevelHistory, level},
    persistence::{PersistedSessionState, SessionPersistence},
    session::{Clock, Interruption, LifecycleSignal, SessionEvent},
    storage::{StorageGateway, numbered_recording_file_name, parse_recording_timestamp},
};

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Default free-space threshold below which [`SessionEvent::LowDiskSpace`] fires (500 MiB).
pub const DEFAULT_LOW_SPACE_THRESHOLD: u64 = 500 * 1024 * 1024;

const EVENT_CAPACITY: usize = 256;

/// Ticks between header syncs of the file being recorded.
const SYNC_EVERY_TICKS: u32 = 10;

/// Upper bound on `_<n>` suffixes tried when a file name is taken.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Called with the final path of every finalized recording.
pub type CompletionHandler = Box<dyn FnMut(&Path) + Send>;

/// Tunables for a [`RecordingSession`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Format requested from the capture device.
    pub format: AudioFormat,
    /// Free bytes below which a low-space warning is published at start.
    pub low_space_threshold: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            low_space_threshold: DEFAULT_LOW_SPACE_THRESHOLD,
        }
    }
}

/// Point-in-time view of the session for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    /// Current state.
    pub state: SessionState,
    /// Recorded time as of the last tick or transition.
    pub elapsed: Duration,
    /// File being recorded, if any.
    pub file_path: Option<PathBuf>,
    /// Recent levels, oldest first.
    pub levels: Vec<f32>,
    /// Correlation id of the current recording.
    pub session_id: Option<Uuid>,
}

/// State machine owning the capture device, timing and snapshot persistence.
///
/// # Thread Safety
///
/// All methods take `&mut self`; the session is meant to be owned by a single
/// task (see [`crate::SessionDriver`]) so control operations never overlap.
///
/// # Timekeeping
///
/// Elapsed time is `accumulated + (now - segment_start)`, computed from the
/// injected [`Clock`] at every tick, so late or missed ticks never drift.
pub struct RecordingSession {
    backend: Box<dyn CaptureBackend>,
    handle: Option<Box<dyn CaptureHandle>>,
    storage: Arc<dyn StorageGateway>,
    persistence: SessionPersistence,
    clock: Arc<dyn Clock>,
    options: SessionOptions,
    state: SessionState,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Local>>,
    segment_start: Option<Instant>,
    accumulated: Duration,
    elapsed: Duration,
    current_file: Option<PathBuf>,
    levels: LevelHistory,
    interrupted: bool,
    ticks_since_sync: u32,
    events: broadcast::Sender<SessionEvent>,
    on_complete: Option<CompletionHandler>,
}

impl RecordingSession {
    /// Creates the session, restoring an in-flight recording from `persistence` if one exists.
    ///
    /// A restored recording comes back `Paused` with its persisted elapsed
    /// time; its device is re-acquired on [`RecordingSession::resume`].
    /// Snapshots pointing at a missing file are discarded. Other files left in
    /// staging by an earlier run are moved into the recordings directory.
    #[instrument(skip_all)]
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        storage: Arc<dyn StorageGateway>,
        persistence: SessionPersistence,
        clock: Arc<dyn Clock>,
        options: SessionOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let mut session = Self {
            backend,
            handle: None,
            storage,
            persistence,
            clock,
            options,
            state: SessionState::Idle,
            session_id: None,
            started_at: None,
            segment_start: None,
            accumulated: Duration::ZERO,
            elapsed: Duration::ZERO,
            current_file: None,
            levels: LevelHistory::default(),
            interrupted: false,
            ticks_since_sync: 0,
            events,
            on_complete: None,
        };
        session.restore();
        session.recover_orphans();
        session
    }

    /// Registers the callback invoked after each successful [`RecordingSession::stop`].
    pub fn set_completion_handler(&mut self, handler: CompletionHandler) {
        self.on_complete = Some(handler);
    }

    /// Subscribes to state changes, ticks and completion notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<SessionEvent> {
        self.events.clone()
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Recorded time as of the last tick or transition.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// File being recorded, if any.
    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    /// Rolling level history.
    pub fn levels(&self) -> &LevelHistory {
        &self.levels
    }

    /// Wall-clock time the current recording started, when known.
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    /// Correlation id of the current recording.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Snapshot for display.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            elapsed: self.elapsed,
            file_path: self.current_file.clone(),
            levels: self.levels.to_vec(),
            session_id: self.session_id,
        }
    }

    /// Starts a new recording.
    ///
    /// # Errors
    ///
    /// `IllegalTransition` unless Idle; `DeviceUnavailable` if the device
    /// cannot be acquired, in which case the session stays Idle.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn start(&mut self) -> CoreResult<()> {
        if self.state != SessionState::Idle {
            return Err(RecorderError::illegal("start", self.state));
        }

        self.check_free_space();

        let started_at = self.clock.wall_time();
        let file_name = self.free_file_name(started_at)?;
        let path = self.storage.staging_path(&file_name);
        let session_id = Uuid::new_v4();

        let handle = self
            .backend
            .acquire(&path, &self.options.format, session_id)?;

        self.handle = Some(handle);
        self.session_id = Some(session_id);
        self.started_at = Some(started_at);
        self.segment_start = Some(self.clock.now());
        self.accumulated = Duration::ZERO;
        self.elapsed = Duration::ZERO;
        self.current_file = Some(path.clone());
        self.levels.clear();
        self.interrupted = false;
        self.ticks_since_sync = 0;

        self.transition(SessionState::Recording);

        info!(session_id = %session_id, file = ?path, "Recording started");

        Ok(())
    }

    /// Suspends capture, keeping the output file open.
    ///
    /// # Errors
    ///
    /// `IllegalTransition` unless Recording.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn pause(&mut self) -> CoreResult<()> {
        if self.state != SessionState::Recording {
            return Err(RecorderError::illegal("pause", self.state));
        }

        if let Some(handle) = self.handle.as_mut() {
            handle.pause()?;
        }
        self.sync_file();

        self.freeze_elapsed();
        self.transition(SessionState::Paused);

        info!(elapsed_ms = self.elapsed.as_millis(), "Recording paused");

        Ok(())
    }

    /// Continues capture into the same file.
    ///
    /// # Errors
    ///
    /// `IllegalTransition` unless Paused; `DeviceUnavailable` when a restored
    /// recording cannot re-acquire the device.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn resume(&mut self) -> CoreResult<()> {
        if self.state != SessionState::Paused {
            return Err(RecorderError::illegal("resume", self.state));
        }

        match self.handle.as_mut() {
            Some(handle) => handle.resume()?,
            None => {
                let Some(path) = self.current_file.clone() else {
                    return Err(RecorderError::illegal("resume", self.state));
                };
                let session_id = *self.session_id.get_or_insert_with(Uuid::new_v4);
                let handle = self
                    .backend
                    .acquire(&path, &self.options.format, session_id)?;
                self.handle = Some(handle);
                debug!(file = ?path, "Device re-acquired for restored recording");
            }
        }

        self.segment_start = Some(self.clock.now());
        self.interrupted = false;
        self.transition(SessionState::Recording);

        info!(elapsed_ms = self.elapsed.as_millis(), "Recording resumed");

        Ok(())
    }

    /// Finalizes the recording and moves it into the recordings directory.
    ///
    /// Returns the final path, or `None` when already Idle. A name taken in the
    /// meantime gets a `_<n>` suffix. The session is Idle and the snapshot
    /// cleared afterwards even if the move fails; the file then stays in
    /// staging until the next launch recovers it.
    ///
    /// # Errors
    ///
    /// `IoFailure` if the finished file cannot be moved.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> CoreResult<Option<PathBuf>> {
        if self.state == SessionState::Idle {
            debug!("Stop ignored, no recording in progress");
            return Ok(None);
        }

        if self.state == SessionState::Recording {
            self.freeze_elapsed();
        }
        let duration = self.elapsed;

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.stop() {
                error!(error = ?e, "Capture device failed to finalize, keeping partial file");
            }
        }

        let staged = self.current_file.take();
        let session_id = self.session_id;
        self.reset();

        let Some(staged) = staged else {
            return Ok(None);
        };

        let Some(destination) = self.free_destination(&staged) else {
            error!(staged = ?staged, "Recording left in staging");
            return Err(RecorderError::io(
                &staged,
                io::Error::new(io::ErrorKind::AlreadyExists, "no free recording name"),
            ));
        };

        if let Err(e) = self.storage.move_file(&staged, &destination) {
            error!(staged = ?staged, error = ?e, "Recording left in staging");
            return Err(e);
        }

        info!(
            session_id = ?session_id,
            file = ?destination,
            duration_ms = duration.as_millis(),
            "Recording finalized"
        );

        self.emit(SessionEvent::Finalized {
            path: destination.clone(),
            duration,
        });
        if let Some(on_complete) = self.on_complete.as_mut() {
            on_complete(&destination);
        }

        Ok(Some(destination))
    }

    /// Stops capture and deletes the in-progress file.
    ///
    /// # Errors
    ///
    /// `IllegalTransition` when Idle; `IoFailure` if the file cannot be deleted.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn discard(&mut self) -> CoreResult<()> {
        if self.state == SessionState::Idle {
            return Err(RecorderError::illegal("discard", self.state));
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.stop() {
                warn!(error = ?e, "Capture device failed to stop cleanly");
            }
        }

        let staged = self.current_file.take();
        self.reset();

        if let Some(path) = staged {
            if path.exists() {
                self.storage.delete(&path)?;
            }
            info!(file = ?path, "Recording discarded");
            self.emit(SessionEvent::Discarded { path });
        }

        Ok(())
    }

    /// Applies an audio-focus change from the host.
    ///
    /// Only a pause caused by an interruption is resumed automatically.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn handle_interruption(&mut self, interruption: Interruption) -> CoreResult<()> {
        match interruption {
            Interruption::Began => {
                if self.state == SessionState::Recording {
                    self.pause()?;
                    self.interrupted = true;
                }
                Ok(())
            }
            Interruption::Ended { should_resume } => {
                if self.state != SessionState::Paused || !self.interrupted {
                    return Ok(());
                }
                if should_resume {
                    self.resume()
                } else {
                    self.interrupted = false;
                    Ok(())
                }
            }
        }
    }

    /// Applies a process lifecycle signal. Both signals are idempotent.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn handle_lifecycle(&mut self, signal: LifecycleSignal) -> CoreResult<()> {
        match signal {
            LifecycleSignal::Terminate => self.stop().map(|_| ()),
            LifecycleSignal::EnterBackground => self.save_state(),
        }
    }

    /// Reacts to a notification raised by the capture device.
    ///
    /// A device that finishes on its own ends the recording through the stop path.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn handle_device_event(&mut self, event: DeviceEvent) -> CoreResult<Option<PathBuf>> {
        let DeviceEvent::Finished {
            session_id,
            successful,
        } = event;

        if !self.state.is_active() {
            debug!("Device event ignored while Idle");
            return Ok(None);
        }

        if self.session_id != Some(session_id) {
            debug!(%session_id, "Device event from an earlier recording ignored");
            return Ok(None);
        }

        if !successful {
            error!(session_id = ?self.session_id, "Capture device failed, finalizing recording");
            self.emit(SessionEvent::DeviceFailed);
        }

        self.stop()
    }

    /// Updates elapsed time and appends one level sample.
    ///
    /// Returns the sampled level, or `None` when not Recording.
    pub fn tick(&mut self) -> Option<f32> {
        if self.state != SessionState::Recording {
            return None;
        }

        self.elapsed = self.live_elapsed();

        let samples = self
            .handle
            .as_mut()
            .map(|handle| handle.drain_meter())
            .unwrap_or_default();
        let level = level(&samples);
        self.levels.push(level);

        self.ticks_since_sync += 1;
        if self.ticks_since_sync >= SYNC_EVERY_TICKS {
            self.sync_file();
        }

        self.emit(SessionEvent::Tick {
            elapsed: self.elapsed,
            level,
        });

        Some(level)
    }

    /// Writes the current snapshot without changing state.
    ///
    /// The audio written so far is synced to disk first. Clears the snapshot
    /// when Idle.
    #[track_caller]
    pub fn save_state(&mut self) -> CoreResult<()> {
        self.sync_file();

        match self.snapshot() {
            Some(snapshot) => self.persistence.save(&snapshot),
            None => self.persistence.clear(),
        }
    }

    fn snapshot(&self) -> Option<PersistedSessionState> {
        if !self.state.is_active() {
            return None;
        }

        self.current_file
            .as_ref()
            .map(|file_path| PersistedSessionState {
                state: self.state,
                elapsed: self.live_elapsed(),
                file_path: file_path.clone(),
            })
    }

    fn restore(&mut self) {
        let Some(snapshot) = self.persistence.load() else {
            return;
        };

        if !snapshot.file_path.is_file() {
            warn!(
                file = ?snapshot.file_path,
                "Persisted recording file is missing, starting fresh"
            );
            if let Err(e) = self.persistence.clear() {
                warn!(error = ?e, "Failed to clear stale session snapshot");
            }
            return;
        }

        if let Err(e) = self.backend.repair(&snapshot.file_path) {
            warn!(file = ?snapshot.file_path, error = ?e, "Failed to repair restored recording");
        }

        self.session_id = Some(Uuid::new_v4());
        self.started_at = parse_recording_timestamp(&snapshot.file_path)
            .and_then(|naive| naive.and_local_timezone(Local).single());
        self.accumulated = snapshot.elapsed;
        self.elapsed = snapshot.elapsed;
        self.current_file = Some(snapshot.file_path.clone());
        // The device did not survive the previous process.
        self.state = SessionState::Paused;
        self.persist();

        info!(
            file = ?snapshot.file_path,
            previous_state = %snapshot.state,
            elapsed_ms = snapshot.elapsed.as_millis(),
            "Restored in-flight recording as paused"
        );
    }

    /// Moves files a crashed run left in staging into the recordings directory.
    fn recover_orphans(&mut self) {
        let staged = match self.storage.list_staged_files() {
            Ok(staged) => staged,
            Err(e) => {
                warn!(error = ?e, "Could not list staged recordings");
                return;
            }
        };

        for path in staged {
            if self.current_file.as_deref() == Some(path.as_path()) {
                continue;
            }

            if let Err(e) = self.backend.repair(&path) {
                warn!(file = ?path, error = ?e, "Failed to repair orphaned recording");
            }

            let Some(destination) = self.free_destination(&path) else {
                warn!(file = ?path, "No free name for orphaned recording");
                continue;
            };

            match self.storage.move_file(&path, &destination) {
                Ok(()) => info!(from = ?path, to = ?destination, "Recovered orphaned recording"),
                Err(e) => warn!(file = ?path, error = ?e, "Failed to recover orphaned recording"),
            }
        }
    }

    /// First `recording_<timestamp>[_<n>]` name free in both staging and the
    /// recordings directory.
    #[track_caller]
    fn free_file_name(&self, started_at: DateTime<Local>) -> CoreResult<String> {
        let extension = &self.options.format.extension;
        let recordings_dir = self.storage.recordings_dir();

        (1..=MAX_NAME_ATTEMPTS)
            .map(|n| numbered_recording_file_name(started_at, extension, n))
            .find(|name| {
                !recordings_dir.join(name).exists() && !self.storage.staging_path(name).exists()
            })
            .ok_or_else(|| {
                RecorderError::io(
                    recordings_dir,
                    io::Error::new(io::ErrorKind::AlreadyExists, "no free recording name"),
                )
            })
    }

    /// Path in the recordings directory for `staged`, suffixed with `_<n>` if taken.
    fn free_destination(&self, staged: &Path) -> Option<PathBuf> {
        let stem = staged.file_stem()?.to_str()?;
        let extension = staged.extension()?.to_str()?;
        let recordings_dir = self.storage.recordings_dir();

        (1..=MAX_NAME_ATTEMPTS)
            .map(|n| match n {
                1 => recordings_dir.join(format!("{}.{}", stem, extension)),
                n => recordings_dir.join(format!("{}_{}.{}", stem, n, extension)),
            })
            .find(|candidate| !candidate.exists())
    }

    /// Flushes the output file so its header matches the audio on disk.
    fn sync_file(&mut self) {
        self.ticks_since_sync = 0;

        if let Some(handle) = self.handle.as_mut()
            && let Err(e) = handle.sync()
        {
            warn!(error = ?e, "Failed to sync recording to disk");
        }
    }

    fn live_elapsed(&self) -> Duration {
        match (self.state, self.segment_start) {
            (SessionState::Recording, Some(start)) => {
                self.accumulated + self.clock.now().saturating_duration_since(start)
            }
            _ => self.accumulated,
        }
    }

    fn freeze_elapsed(&mut self) {
        self.accumulated = self.live_elapsed();
        self.elapsed = self.accumulated;
        self.segment_start = None;
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        self.state = to;
        self.persist();
        debug!(%from, %to, "Session state changed");
        self.emit(SessionEvent::StateChanged { from, to });
    }

    fn reset(&mut self) {
        self.handle = None;
        self.session_id = None;
        self.started_at = None;
        self.segment_start = None;
        self.accumulated = Duration::ZERO;
        self.elapsed = Duration::ZERO;
        self.current_file = None;
        self.levels.clear();
        self.interrupted = false;
        self.ticks_since_sync = 0;
        self.transition(SessionState::Idle);
    }

    /// Snapshot writes never fail a transition; a missed write only costs restorability.
    fn persist(&mut self) {
        if let Err(e) = self.save_state() {
            warn!(error = ?e, state = %self.state, "Failed to persist session snapshot");
        }
    }

    fn check_free_space(&self) {
        let threshold = self.options.low_space_threshold;

        match self.storage.available_free_space() {
            Ok(available) if available < threshold => {
                warn!(available, threshold, "Low disk space");
                self.emit(SessionEvent::LowDiskSpace {
                    available,
                    threshold,
                });
            }
            Ok(available) => debug!(available, "Free space checked"),
            Err(e) => warn!(error = ?e, "Could not determine free space"),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}
