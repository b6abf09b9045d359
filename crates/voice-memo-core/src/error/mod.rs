use crate::SessionState;

use std::{panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use thiserror::Error;

/// Recorder errors with source location tracking.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// The capture device could not be acquired (permission denied, in use elsewhere).
    #[error("Capture device unavailable: {reason} {location}")]
    DeviceUnavailable {
        /// Description of the device failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A file operation failed.
    #[error("IO failure on {path:?}: {source} {location}")]
    IoFailure {
        /// Path the operation was acting on.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A persisted session snapshot was corrupt or unrecognized.
    #[error("Invalid persisted session state: {reason} {location}")]
    InvalidPersistedState {
        /// Why the snapshot was rejected.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An operation was invoked in a state that forbids it.
    #[error("Cannot {operation} while {state:?} {location}")]
    IllegalTransition {
        /// The rejected operation.
        operation: &'static str,
        /// Session state at the time of the call.
        state: SessionState,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A catalog index was outside the current list.
    #[error("Index {index} out of bounds for {len} recordings {location}")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of entries in the catalog.
        len: usize,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A recording name was rejected.
    #[error("Invalid recording name {name:?} {location}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Session snapshot could not be encoded.
    #[error("Serialization error: {reason} {location}")]
    Serialization {
        /// Description of the encoding failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The session driver is no longer running.
    #[error("Session driver unavailable: {reason} {location}")]
    DriverUnavailable {
        /// Description of the channel failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl RecorderError {
    /// Wraps an IO error with the path it occurred on.
    #[track_caller]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecorderError::IoFailure {
            path: path.into(),
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn illegal(operation: &'static str, state: SessionState) -> Self {
        RecorderError::IllegalTransition {
            operation,
            state,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`RecorderError`].
pub type Result<T> = std::result::Result<T, RecorderError>;
