//! Clock-driven waiting helpers.
//!
//! These are the polling and backoff loops that time-dependent services are
//! built from. They only ever talk to a [`Clock`], so the same loop runs
//! against the wall clock in production and a virtual clock in tests.

use crate::clock::Clock;
use crate::error::{validate_seconds, TimeError};
use thiserror::Error;
use tracing::{debug, trace};

/// Polls `ready` every `interval` seconds until it returns true or
/// `timeout` seconds have elapsed.
///
/// The predicate is checked once more at the deadline, so a condition that
/// becomes true exactly at `timeout` still counts.
///
/// # Returns
/// * `Ok(true)` - the predicate held before the deadline
/// * `Ok(false)` - timed out
/// * `Err(_)` - the clock rejected a sleep (or the simulation ended)
pub fn wait_until<C, F>(
    clock: &mut C,
    interval: f64,
    timeout: f64,
    mut ready: F,
) -> Result<bool, TimeError>
where
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    validate_seconds(timeout)?;
    if validate_seconds(interval)? == 0.0 {
        return Err(TimeError::invalid_argument(interval));
    }

    let deadline = clock.now() + timeout;
    loop {
        if ready() {
            return Ok(true);
        }

        let now = clock.now();
        if now >= deadline {
            debug!(now, deadline, "wait_until timed out");
            return Ok(false);
        }

        let nap = interval.min(deadline - now);
        trace!(now, nap, "condition not met, polling again");
        clock.sleep(nap)?;
    }
}

/// Exponential backoff policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay before the first retry, in seconds
    pub initial: f64,

    /// Multiplier applied after every failed retry
    pub factor: f64,

    /// Upper bound for a single delay, in seconds
    pub max_delay: f64,

    /// Total attempts including the first one
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: 1.0,
            factor: 2.0,
            max_delay: 30.0,
            max_attempts: 5,
        }
    }
}

impl Backoff {
    /// Returns the delay slept after the `retry`-th failure (0-based).
    pub fn delay(&self, retry: u32) -> f64 {
        let exp = i32::try_from(retry).unwrap_or(i32::MAX);
        (self.initial * self.factor.powi(exp)).min(self.max_delay)
    }

    /// Sum of every delay a fully failing run sleeps.
    pub fn total_delay(&self) -> f64 {
        (0..self.max_attempts.saturating_sub(1))
            .map(|retry| self.delay(retry))
            .sum()
    }
}

/// Failure of a [`retry`] loop.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last operation error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// The clock failed while backing off
    #[error(transparent)]
    Clock(#[from] TimeError),
}

/// Runs `op` until it succeeds, sleeping according to `backoff` between
/// attempts.
///
/// `op` receives the 0-based attempt number.
pub fn retry<C, T, E, F>(clock: &mut C, backoff: &Backoff, mut op: F) -> Result<T, RetryError<E>>
where
    C: Clock + ?Sized,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = backoff.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(last) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last,
                    });
                }

                let delay = backoff.delay(attempt - 1);
                debug!(attempt, delay, "attempt failed, backing off");
                clock.sleep(delay)?;
            }
        }
    }
}
