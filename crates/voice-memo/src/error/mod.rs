use voice_memo_core::RecorderError;

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Application-level errors for the voice-memo binary.
///
/// All variants include `ErrorLocation` for call-site tracking.
#[derive(Error, Debug)]
pub enum AppError {
    /// Recorder error from voice-memo-core.
    #[error("Recorder error: {source} {location}")]
    Recorder {
        /// The underlying recorder error.
        #[source]
        source: RecorderError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// A console line could not be parsed into a command.
    #[error("Invalid command {input:?}: {reason} {location}")]
    InvalidCommand {
        /// The line as typed.
        input: String,
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Failed to send message through async channel.
    #[error("Channel send failed: {message} {location}")]
    ChannelSendFailed {
        /// Human-readable error message.
        message: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Configuration loading or saving error.
    #[error("Configuration error: {reason} {location}")]
    ConfigError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Logging could not be initialized.
    #[error("Logging error: {reason} {location}")]
    LoggingError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// IO error from filesystem or console operations.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

// Manual From<RecorderError> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<RecorderError> for AppError {
    #[track_caller]
    fn from(source: RecorderError) -> Self {
        AppError::Recorder {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        AppError::IoError {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Convenience type alias for Results using `AppError`.
pub type Result<T> = StdResult<T, AppError>;
