use std::fmt;

/// Recording state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not recording. The only state in which a new recording can start.
    #[default]
    Idle,
    /// Capturing audio into the current file.
    Recording,
    /// Capture suspended, output file still open.
    Paused,
}

impl SessionState {
    /// Stable name used in persisted snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Recording => "recording",
            SessionState::Paused => "paused",
        }
    }

    /// Parses a name produced by [`SessionState::as_str`].
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "idle" => Some(SessionState::Idle),
            "recording" => Some(SessionState::Recording),
            "paused" => Some(SessionState::Paused),
            _ => None,
        }
    }

    /// Whether a recording is in flight.
    pub fn is_active(self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
