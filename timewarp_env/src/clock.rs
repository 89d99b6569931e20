//! Blocking clock abstraction and its real implementation.

use crate::error::{timer_duration, TimeError};
use std::time::{Duration, Instant};

/// The synchronous `now`/`sleep` pair that time-dependent code calls.
///
/// Production code is written against this trait; tests hand it a
/// `VirtualClock` instead of a `SystemClock`.
pub trait Clock {
    /// Returns the current time in seconds since the clock started.
    fn now(&self) -> f64;

    /// Blocks (or pretends to) for `seconds`.
    fn sleep(&mut self, seconds: f64) -> Result<(), TimeError>;

    /// Sleeps for a `Duration`.
    fn sleep_for(&mut self, duration: Duration) -> Result<(), TimeError> {
        self.sleep(duration.as_secs_f64())
    }
}

/// Real clock backed by `Instant` and `std::thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl SystemClock {
    /// Creates a clock whose `now()` starts at zero.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(&mut self, seconds: f64) -> Result<(), TimeError> {
        let duration = timer_duration(seconds)?;
        std::thread::sleep(duration);
        Ok(())
    }
}
