pub(crate) mod capture;
mod device;
mod meter;

pub use {
    capture::CpalCaptureBackend,
    device::{AudioFormat, CaptureBackend, CaptureHandle, DEFAULT_SAMPLE_RATE, DeviceEvent},
    meter::{LEVEL_HISTORY_CAPACITY, LevelHistory, MIN_LEVEL_DB, level},
};
