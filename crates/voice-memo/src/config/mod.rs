mod audio_config;
#[allow(clippy::module_inception)]
mod config;
mod session_config;
mod storage_config;

pub(crate) use {
    audio_config::AudioConfig,
    config::{Config, log_dir, project_dirs, state_dir},
    session_config::SessionConfig,
    storage_config::StorageConfig,
};

use voice_memo_core::{DEFAULT_SAMPLE_RATE, DEFAULT_TICK_INTERVAL};

pub(crate) const DEFAULT_CHANNELS: u16 = 1;
pub(crate) const DEFAULT_LOW_SPACE_THRESHOLD_MB: u64 = 500;

pub(crate) fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

pub(crate) fn default_channels() -> u16 {
    DEFAULT_CHANNELS
}

pub(crate) fn default_low_space_threshold_mb() -> u64 {
    DEFAULT_LOW_SPACE_THRESHOLD_MB
}

pub(crate) fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL.as_millis() as u64
}
