use crate::{CoreResult, RecorderError, SessionState};

use std::{panic::Location, path::PathBuf, time::Duration};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};

/// Durable snapshot of an in-flight recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSessionState {
    /// `Recording` or `Paused`.
    pub state: SessionState,
    /// Recorded time up to the snapshot.
    pub elapsed: Duration,
    /// Output file, possibly incomplete.
    pub file_path: PathBuf,
}

/// On-disk layout of [`PersistedSessionState`].
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    state: String,
    elapsed_secs: u64,
    elapsed_nanos: u32,
    file_path: String,
}

impl PersistedSessionState {
    #[track_caller]
    pub(crate) fn encode(&self) -> CoreResult<String> {
        let file_path = self
            .file_path
            .to_str()
            .ok_or_else(|| RecorderError::Serialization {
                reason: format!("Path is not valid UTF-8: {:?}", self.file_path),
                location: ErrorLocation::from(Location::caller()),
            })?
            .to_string();

        let record = SnapshotRecord {
            state: self.state.as_str().to_string(),
            elapsed_secs: self.elapsed.as_secs(),
            elapsed_nanos: self.elapsed.subsec_nanos(),
            file_path,
        };

        toml::to_string(&record).map_err(|e| RecorderError::Serialization {
            reason: format!("Failed to serialize session snapshot: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Parses and validates a stored snapshot.
    ///
    /// Rejects unknown or idle states, out-of-range durations and empty paths.
    #[track_caller]
    pub(crate) fn decode(raw: &str) -> CoreResult<Self> {
        let invalid = |reason: String| RecorderError::InvalidPersistedState {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        let record: SnapshotRecord =
            toml::from_str(raw).map_err(|e| invalid(format!("Failed to parse snapshot: {}", e)))?;

        let state = match SessionState::parse(&record.state) {
            Some(state) if state.is_active() => state,
            _ => return Err(invalid(format!("Unrecognized state {:?}", record.state))),
        };

        if record.elapsed_nanos >= 1_000_000_000 {
            return Err(invalid(format!(
                "Sub-second component out of range: {}",
                record.elapsed_nanos
            )));
        }

        if record.file_path.trim().is_empty() || record.file_path.contains('\0') {
            return Err(invalid(format!("Invalid file path {:?}", record.file_path)));
        }

        Ok(Self {
            state,
            elapsed: Duration::new(record.elapsed_secs, record.elapsed_nanos),
            file_path: PathBuf::from(record.file_path),
        })
    }
}
