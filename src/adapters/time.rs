//! Host time adapter.
//!
//! Wall-clock seconds for sample timestamps come from `chrono::Utc`;
//! uptime comes from the monotonic `std::time::Instant`.

use std::time::Instant;

use crate::app::ports::ClockPort;

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since construction (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

impl ClockPort for SystemClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
