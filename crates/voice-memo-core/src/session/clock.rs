use std::time::Instant;

use chrono::{DateTime, Local};

/// Time source for session timekeeping.
pub trait Clock: Send + Sync {
    /// Monotonic instant used for elapsed-time arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock time used to name recordings.
    fn wall_time(&self) -> DateTime<Local>;
}

/// [`Clock`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_time(&self) -> DateTime<Local> {
        Local::now()
    }
}
