#![allow(clippy::unwrap_used)]

use crate::{
    AudioFormat, CaptureBackend, CaptureHandle, Clock, CoreResult, FsStorageGateway,
    MemoryKeyValueStore, RecordingSession, RecorderError, SessionOptions, SessionPersistence,
};

use std::{
    panic::Location,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, Local, TimeZone};
use error_location::ErrorLocation;
use tempfile::TempDir;
use uuid::Uuid;

/// Everything the fake device saw, shared with the test.
#[derive(Debug, Default)]
pub(crate) struct DeviceLog {
    pub acquired: Vec<PathBuf>,
    pub session_ids: Vec<Uuid>,
    pub repaired: Vec<PathBuf>,
    pub paused: bool,
    pub pause_calls: usize,
    pub resume_calls: usize,
    pub stop_calls: usize,
    pub sync_calls: usize,
    pub live_handles: usize,
    pub fail_acquire: bool,
    pub meter_samples: Vec<f32>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeDevice {
    pub log: Arc<Mutex<DeviceLog>>,
}

impl FakeDevice {
    pub fn with_meter(samples: Vec<f32>) -> Self {
        let device = Self::default();
        device.log.lock().unwrap().meter_samples = samples;
        device
    }

    pub fn fail_next_acquire(&self, fail: bool) {
        self.log.lock().unwrap().fail_acquire = fail;
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&DeviceLog) -> T) -> T {
        f(&self.log.lock().unwrap())
    }
}

impl CaptureBackend for FakeDevice {
    fn acquire(
        &mut self,
        destination: &Path,
        _format: &AudioFormat,
        session_id: Uuid,
    ) -> CoreResult<Box<dyn CaptureHandle>> {
        let mut log = self.log.lock().unwrap();
        if log.fail_acquire {
            return Err(RecorderError::DeviceUnavailable {
                reason: "microphone in use".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        std::fs::write(destination, b"RIFF").unwrap();
        log.acquired.push(destination.to_path_buf());
        log.session_ids.push(session_id);
        log.paused = false;
        log.live_handles += 1;

        Ok(Box::new(FakeHandle {
            log: Arc::clone(&self.log),
        }))
    }

    fn repair(&mut self, destination: &Path) -> CoreResult<()> {
        self.log
            .lock()
            .unwrap()
            .repaired
            .push(destination.to_path_buf());
        Ok(())
    }
}

struct FakeHandle {
    log: Arc<Mutex<DeviceLog>>,
}

impl CaptureHandle for FakeHandle {
    fn pause(&mut self) -> CoreResult<()> {
        let mut log = self.log.lock().unwrap();
        log.paused = true;
        log.pause_calls += 1;
        Ok(())
    }

    fn resume(&mut self) -> CoreResult<()> {
        let mut log = self.log.lock().unwrap();
        log.paused = false;
        log.resume_calls += 1;
        Ok(())
    }

    fn drain_meter(&mut self) -> Vec<f32> {
        self.log.lock().unwrap().meter_samples.clone()
    }

    fn sync(&mut self) -> CoreResult<()> {
        self.log.lock().unwrap().sync_calls += 1;
        Ok(())
    }

    fn stop(self: Box<Self>) -> CoreResult<()> {
        let mut log = self.log.lock().unwrap();
        log.stop_calls += 1;
        log.live_handles -= 1;
        Ok(())
    }
}

/// Clock advanced by hand.
#[derive(Clone)]
pub(crate) struct ManualClock {
    origin: Instant,
    now: Arc<Mutex<Instant>>,
    wall: DateTime<Local>,
}

impl ManualClock {
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            origin,
            now: Arc::new(Mutex::new(origin)),
            wall: Local.with_ymd_and_hms(2024, 6, 16, 14, 3, 22).unwrap(),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }

    fn wall_time(&self) -> DateTime<Local> {
        let offset = self.now().duration_since(self.origin);
        self.wall + chrono::Duration::from_std(offset).unwrap()
    }
}

/// Temp recordings directory plus the doubles a session needs.
pub(crate) struct Fixture {
    pub dir: TempDir,
    pub storage: Arc<FsStorageGateway>,
    pub store: MemoryKeyValueStore,
    pub clock: ManualClock,
    pub device: FakeDevice,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FsStorageGateway::new(dir.path().join("recordings"), "wav").unwrap());

        Self {
            dir,
            storage,
            store: MemoryKeyValueStore::new(),
            clock: ManualClock::new(),
            device: FakeDevice::with_meter(vec![0.5; 128]),
        }
    }

    pub fn persistence(&self) -> SessionPersistence {
        SessionPersistence::new(Box::new(self.store.clone()))
    }

    pub fn session(&self) -> RecordingSession {
        self.session_with(SessionOptions {
            low_space_threshold: 0,
            ..SessionOptions::default()
        })
    }

    pub fn session_with(&self, options: SessionOptions) -> RecordingSession {
        RecordingSession::new(
            Box::new(self.device.clone()),
            self.storage.clone(),
            self.persistence(),
            Arc::new(self.clock.clone()),
            options,
        )
    }

    pub fn recordings_dir(&self) -> PathBuf {
        self.dir.path().join("recordings")
    }
}
