use crate::SessionState;

use std::{path::PathBuf, time::Duration};

/// Notifications published by the session to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The session moved between states.
    StateChanged {
        /// Previous state.
        from: SessionState,
        /// New state.
        to: SessionState,
    },
    /// One periodic update while recording.
    Tick {
        /// Recorded time so far.
        elapsed: Duration,
        /// Level sampled for this tick.
        level: f32,
    },
    /// A recording was finalized and moved into the recordings directory.
    Finalized {
        /// Final location of the recording.
        path: PathBuf,
        /// Total recorded time.
        duration: Duration,
    },
    /// An in-flight recording was thrown away.
    Discarded {
        /// The deleted staging file.
        path: PathBuf,
    },
    /// Free space fell below the configured threshold when a recording started.
    LowDiskSpace {
        /// Bytes available.
        available: u64,
        /// Configured threshold in bytes.
        threshold: u64,
    },
    /// The capture device ended the recording with an error.
    DeviceFailed,
}

/// Audio-focus notifications from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    /// Another party took the audio input.
    Began,
    /// The interruption is over.
    Ended {
        /// Whether the host asks for capture to continue.
        should_resume: bool,
    },
}

/// Process lifecycle notifications from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// The process is about to exit. Forces a stop.
    Terminate,
    /// The process is being backgrounded. Forces a snapshot write.
    EnterBackground,
}
