//! Configuration management for voice-memo.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, validation on load, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{AudioConfig, DEFAULT_LOW_SPACE_THRESHOLD_MB, SessionConfig, StorageConfig},
};

use voice_memo_core::{AudioFormat, SessionOptions};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const AUDIO_EXTENSION: &str = "wav";
const MAX_CHANNELS: u16 = 2;

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Audio device configuration.
    #[serde(default)]
    pub audio: AudioConfig,
    /// Recordings directory and disk-space warning.
    pub storage: StorageConfig,
    /// Session timing.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from the platform config directory, creating a default if not found.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let proj_dirs = project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Self::load_from(&config_dir.join("config.toml"), proj_dirs.data_dir())
    }

    /// Load configuration from `config_path`, writing a default rooted at `data_dir` if absent.
    #[track_caller]
    #[instrument]
    pub fn load_from(config_path: &Path, data_dir: &Path) -> AppResult<Self> {
        if !config_path.exists() {
            info!("No config found, creating default");
            let config = Self::default_for(data_dir);
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to read config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        config.validate()?;

        info!(config_path = ?config_path, "Configuration loaded");

        Ok(config)
    }

    /// Defaults with recordings under `<data_dir>/recordings`.
    pub fn default_for(data_dir: &Path) -> Self {
        Self {
            audio: AudioConfig::default(),
            storage: StorageConfig {
                recordings_dir: data_dir.join("recordings"),
                low_space_threshold_mb: DEFAULT_LOW_SPACE_THRESHOLD_MB,
            },
            session: SessionConfig::default(),
        }
    }

    /// Reject values the recorder cannot work with.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        let reason = if self.audio.sample_rate == 0 {
            Some("audio.sample_rate must be greater than 0".to_string())
        } else if !(1..=MAX_CHANNELS).contains(&self.audio.channels) {
            Some(format!("audio.channels must be between 1 and {}", MAX_CHANNELS))
        } else if self.session.tick_interval_ms == 0 {
            Some("session.tick_interval_ms must be greater than 0".to_string())
        } else if self.storage.recordings_dir.as_os_str().is_empty() {
            Some("storage.recordings_dir must not be empty".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => Err(AppError::ConfigError {
                reason,
                location: ErrorLocation::from(Location::caller()),
            }),
            None => Ok(()),
        }
    }

    /// Save configuration to `config_path` using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Atomic write: write to temp file then rename
        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Session tunables derived from the audio and storage sections.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            format: AudioFormat {
                sample_rate: self.audio.sample_rate,
                channels: self.audio.channels,
                extension: AUDIO_EXTENSION.to_string(),
            },
            low_space_threshold: self.storage.low_space_threshold_mb.saturating_mul(1024 * 1024),
        }
    }

    /// Extension of recorded files.
    pub fn audio_extension(&self) -> &'static str {
        AUDIO_EXTENSION
    }
}

/// Platform directories for voice-memo.
#[track_caller]
pub(crate) fn project_dirs() -> AppResult<ProjectDirs> {
    ProjectDirs::from("com", "voice-memo", "Voice-Memo").ok_or_else(|| AppError::ConfigError {
        reason: "Failed to get project directories".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Directory holding the persisted session snapshot.
pub(crate) fn state_dir(proj_dirs: &ProjectDirs) -> PathBuf {
    proj_dirs.data_dir().join("state")
}

/// Directory holding rolling log files.
pub(crate) fn log_dir(proj_dirs: &ProjectDirs) -> PathBuf {
    proj_dirs.data_dir().join("logs")
}
