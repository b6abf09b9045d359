use crate::config::default_tick_interval_ms;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Recording session behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Interval between duration and level updates while recording.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl SessionConfig {
    /// Tick interval as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}
