use crate::CoreResult;

use std::path::Path;

use uuid::Uuid;

/// Sample rate requested from the capture device.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Requested output format for a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    /// Samples per second.
    pub sample_rate: u32,
    /// Channels written to the output file.
    pub channels: u16,
    /// File extension of recordings, without the dot.
    pub extension: String,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
            extension: "wav".to_string(),
        }
    }
}

/// Notifications a capture device raises outside of a direct call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The device stopped producing audio on its own.
    Finished {
        /// Recording the device was acquired for.
        session_id: Uuid,
        /// `false` when the stream ended because of an error.
        successful: bool,
    },
}

/// Source of capture handles. At most one handle is alive at a time.
pub trait CaptureBackend: Send {
    /// Opens `destination` and starts writing captured audio into it.
    ///
    /// Appends when `destination` already holds audio from an earlier run.
    /// Events raised by the capture carry `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` when the microphone cannot be acquired.
    fn acquire(
        &mut self,
        destination: &Path,
        format: &AudioFormat,
        session_id: Uuid,
    ) -> CoreResult<Box<dyn CaptureHandle>>;

    /// Makes a file left behind by a killed process readable again.
    fn repair(&mut self, _destination: &Path) -> CoreResult<()> {
        Ok(())
    }
}

/// A live capture into a single output file.
pub trait CaptureHandle: Send {
    /// Stops writing samples without closing the file.
    fn pause(&mut self) -> CoreResult<()>;

    /// Continues writing into the same file.
    fn resume(&mut self) -> CoreResult<()>;

    /// Returns the samples captured since the previous call.
    fn drain_meter(&mut self) -> Vec<f32>;

    /// Pushes buffered audio and the current length to disk.
    fn sync(&mut self) -> CoreResult<()>;

    /// Releases the device and finalizes the output file.
    fn stop(self: Box<Self>) -> CoreResult<()>;
}
