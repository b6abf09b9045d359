//! Voice-memo Core Library
//!
//! Recording session lifecycle for a personal voice-memo recorder: microphone
//! capture through CPAL, WAV output through hound, level metering, snapshot
//! persistence across restarts, and a catalog of finished recordings.
//!
//! # Example
//!
//! ```no_run
//! use voice_memo_core::{
//!     CoreResult, CpalCaptureBackend, DEFAULT_TICK_INTERVAL, FileKeyValueStore,
//!     FsStorageGateway, RecordingSession, SessionDriver, SessionOptions, SessionPersistence,
//!     SystemClock,
//! };
//!
//! use std::{sync::Arc, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let (device_tx, device_rx) = tokio::sync::mpsc::unbounded_channel();
//!     let storage = Arc::new(FsStorageGateway::new("recordings", "wav")?);
//!     let persistence = SessionPersistence::new(Box::new(FileKeyValueStore::new("state")?));
//!
//!     let session = RecordingSession::new(
//!         Box::new(CpalCaptureBackend::new(None, device_tx)),
//!         storage,
//!         persistence,
//!         Arc::new(SystemClock),
//!         SessionOptions::default(),
//!     );
//!     let (driver, handle) = SessionDriver::new(session, device_rx, DEFAULT_TICK_INTERVAL);
//!     tokio::spawn(driver.run());
//!
//!     handle.start().await?;
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!     let saved = handle.stop().await?;
//!
//!     println!("Saved: {:?}", saved);
//!     Ok(())
//! }
//! ```

mod audio;
mod catalog;
mod error;
mod persistence;
mod session;
mod storage;

pub use {
    audio::{
        AudioFormat, CaptureBackend, CaptureHandle, CpalCaptureBackend, DEFAULT_SAMPLE_RATE,
        DeviceEvent, LEVEL_HISTORY_CAPACITY, LevelHistory, MIN_LEVEL_DB, level,
    },
    catalog::{RecordingCatalog, RecordingEntry},
    error::{RecorderError, Result as CoreResult},
    persistence::{
        FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PersistedSessionState,
        SESSION_KEY, SessionPersistence,
    },
    session::{
        Clock, CompletionHandler, DEFAULT_LOW_SPACE_THRESHOLD, DEFAULT_TICK_INTERVAL,
        Interruption, LifecycleSignal, RecordingSession, SessionDriver, SessionEvent,
        SessionHandle, SessionOptions, SessionState, SessionStatus, SystemClock,
    },
    storage::{
        FsStorageGateway, STAGING_DIR_NAME, StorageGateway, numbered_recording_file_name,
        parse_recording_timestamp, recording_file_name,
    },
};

#[cfg(test)]
mod tests;
