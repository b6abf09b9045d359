use crate::config::{default_channels, default_sample_rate};

use serde::{Deserialize, Serialize};

/// Audio device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Selected audio device name (None = default device).
    #[serde(default)]
    pub selected_device: Option<String>,
    /// Requested sample rate in Hz. The device rate wins when they differ.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Channels written to the file (1 = mono).
    #[serde(default = "default_channels")]
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            selected_device: None,
            sample_rate: default_sample_rate(),
            channels: default_channels(),
        }
    }
}
