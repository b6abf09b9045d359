mod clock;
mod driver;
mod events;
#[allow(clippy::module_inception)]
mod session;
mod state;

pub use {
    clock::{Clock, SystemClock},
    driver::{DEFAULT_TICK_INTERVAL, SessionDriver, SessionHandle},
    events::{Interruption, LifecycleSignal, SessionEvent},
    session::{
        CompletionHandler, DEFAULT_LOW_SPACE_THRESHOLD, RecordingSession, SessionOptions,
        SessionStatus,
    },
    state::SessionState,
};
