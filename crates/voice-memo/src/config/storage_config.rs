use crate::config::default_low_space_threshold_mb;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where recordings live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding finished recordings.
    pub recordings_dir: PathBuf,
    /// Free space in MiB below which a warning is shown when recording starts.
    #[serde(default = "default_low_space_threshold_mb")]
    pub low_space_threshold_mb: u64,
}
