//! The virtual clock.

use crate::chronology::Chronology;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use timewarp_env::{validate_seconds, Clock, TimeError};
use tracing::{debug, error, trace};

/// One pull from the chronology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    /// Ordinal of the pull (0 = construction)
    pub index: u64,

    /// Clock time when the step was pulled
    pub at: f64,

    /// Step value produced by the chronology
    pub step: f64,

    /// Threshold after adding the step
    pub threshold: f64,
}

/// Deterministic stand-in for the wall clock.
///
/// The clock holds the current simulated time (`now`) and the next wake
/// threshold (`next`). `sleep` moves `now` forward instantly; whenever
/// that crosses `next`, the chronology is pulled (letting the simulated
/// world react) until the threshold lies strictly beyond the new time.
///
/// # Invariants
///
/// - `now` starts at 0 and never decreases
/// - `next >= now` at all times, and `next > now` after any `sleep`
/// - chronology pulls happen in order, one at a time, only inside
///   `new` and `sleep`
///
/// # End of times
///
/// If the chronology runs dry while the clock still needs a threshold,
/// `sleep` fails with [`TimeError::EndOfTimes`] and the clock halts: every
/// later `sleep` fails the same way. Either the scenario was scripted too
/// short, or the code under test waits forever.
pub struct VirtualClock<C> {
    /// Current simulated time in seconds
    now: f64,

    /// Time at which the last pulled step completes
    next: f64,

    chronology: C,

    /// Every pull made so far
    trace: Vec<Draw>,

    /// Set once the chronology has failed us
    halted: bool,
}

impl<C: Chronology> VirtualClock<C> {
    /// Starts a clock at t=0, pulling the first threshold immediately.
    ///
    /// Any setup the chronology performs on its first pull has run by the
    /// time this returns.
    ///
    /// # Errors
    /// * `TimeError::EmptyChronology` - the chronology yields nothing
    /// * `TimeError::InvalidStep` - the first step is negative or not finite
    pub fn new(mut chronology: C) -> Result<Self, TimeError> {
        let step = chronology.next_step().ok_or(TimeError::EmptyChronology)?;
        let step = check_step(step)?;

        debug!(threshold = step, "virtual clock started");

        Ok(Self {
            now: 0.0,
            next: step,
            chronology,
            trace: vec![Draw {
                index: 0,
                at: 0.0,
                step,
                threshold: step,
            }],
            halted: false,
        })
    }

    /// Advances simulated time by `seconds`.
    ///
    /// # Errors
    /// * `TimeError::InvalidArgument` - `seconds` is negative or not finite;
    ///   the clock is left untouched
    /// * `TimeError::EndOfTimes` - the chronology ran out before the
    ///   threshold passed the target (fatal)
    /// * `TimeError::InvalidStep` - the chronology produced a bad step (fatal)
    pub fn sleep(&mut self, seconds: f64) -> Result<(), TimeError> {
        validate_seconds(seconds)?;

        if self.halted {
            return Err(self.end_of_times());
        }

        let target = self.now + seconds;
        if target < self.next {
            trace!(now = target, next = self.next, "sleep ends before threshold");
            self.now = target;
            return Ok(());
        }

        // Time has passed even if the chronology lets us down below
        self.now = target;

        while self.next <= target {
            let step = match self.chronology.next_step() {
                Some(step) => step,
                None => {
                    self.halted = true;
                    error!(now = self.now, next = self.next, "chronology exhausted: end of times");
                    return Err(self.end_of_times());
                }
            };

            let step = check_step(step).map_err(|err| {
                self.halted = true;
                error!(now = self.now, step, "chronology produced an invalid step");
                err
            })?;

            self.next += step;
            self.trace.push(Draw {
                index: self.trace.len() as u64,
                at: self.now,
                step,
                threshold: self.next,
            });
            debug!(now = self.now, step, next = self.next, "threshold crossed");
        }

        Ok(())
    }

    /// Sleeps for a `Duration`.
    pub fn sleep_for(&mut self, duration: Duration) -> Result<(), TimeError> {
        self.sleep(duration.as_secs_f64())
    }

    /// Like [`sleep`](Self::sleep), but treats any failure as a broken test.
    ///
    /// # Panics
    /// Panics with the error message if the sleep fails.
    pub fn advance(&mut self, seconds: f64) {
        if let Err(err) = self.sleep(seconds) {
            panic!("virtual clock: {}", err);
        }
    }
}

impl<C> VirtualClock<C> {
    /// Returns the current simulated time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Returns the current simulated time as a `Duration`.
    pub fn now_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.now).unwrap_or(Duration::MAX)
    }

    /// Returns the time at which the next chronology pull happens.
    pub fn next_threshold(&self) -> f64 {
        self.next
    }

    /// Number of chronology pulls so far, construction included.
    pub fn draw_count(&self) -> usize {
        self.trace.len()
    }

    /// Every chronology pull, in order.
    pub fn trace(&self) -> &[Draw] {
        &self.trace
    }

    /// Returns true once the chronology has been exhausted.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Consumes the clock, returning its trace.
    pub fn into_trace(self) -> Vec<Draw> {
        self.trace
    }

    fn end_of_times(&self) -> TimeError {
        TimeError::EndOfTimes {
            now: self.now,
            next: self.next,
        }
    }
}

impl<C: Chronology> Clock for VirtualClock<C> {
    fn now(&self) -> f64 {
        self.now
    }

    fn sleep(&mut self, seconds: f64) -> Result<(), TimeError> {
        VirtualClock::sleep(self, seconds)
    }
}

impl<C> fmt::Debug for VirtualClock<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualClock")
            .field("now", &self.now)
            .field("next", &self.next)
            .field("draws", &self.trace.len())
            .field("halted", &self.halted)
            .finish()
    }
}

fn check_step(step: f64) -> Result<f64, TimeError> {
    if step.is_finite() && step >= 0.0 {
        Ok(step)
    } else {
        Err(TimeError::InvalidStep { step })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chronology::Timeline;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_starts_at_zero() {
        let clock = VirtualClock::new(vec![5.0].into_iter()).unwrap();
        assert_eq!(clock.now(), 0.0);
        assert_eq!(clock.next_threshold(), 5.0);
        assert_eq!(clock.draw_count(), 1);
    }

    #[test]
    fn test_empty_chronology_fails_construction() {
        let err = VirtualClock::new(std::iter::empty::<f64>()).unwrap_err();
        assert_eq!(err, TimeError::EmptyChronology);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_first_pull_runs_setup() {
        let ready = Arc::new(Mutex::new(false));
        let flag = ready.clone();
        let timeline = Timeline::new()
            .setup(move || *flag.lock().unwrap() = true)
            .then_idle(1.0);

        let _clock = VirtualClock::new(timeline).unwrap();
        assert!(*ready.lock().unwrap());
    }

    #[test]
    fn test_sleep_below_threshold_does_not_pull() {
        let mut clock = VirtualClock::new(vec![5.0, 3.0, 100.0].into_iter()).unwrap();

        clock.sleep(2.0).unwrap();

        assert_eq!(clock.now(), 2.0);
        assert_eq!(clock.next_threshold(), 5.0);
        assert_eq!(clock.draw_count(), 1);
    }

    #[test]
    fn test_sleep_drains_crossed_thresholds() {
        let mut clock = VirtualClock::new(vec![5.0, 3.0, 100.0].into_iter()).unwrap();

        clock.sleep(2.0).unwrap();
        clock.sleep(10.0).unwrap();

        assert_eq!(clock.now(), 12.0);
        assert_eq!(clock.next_threshold(), 108.0);

        // Exactly two pulls on top of the construction one
        let thresholds: Vec<f64> = clock.trace().iter().map(|d| d.threshold).collect();
        assert_eq!(thresholds, vec![5.0, 8.0, 108.0]);
        assert!(clock.trace()[1..].iter().all(|d| d.at == 12.0));

        let indices: Vec<u64> = clock.trace().iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_sleep_beyond_duration_range() {
        // Longer than `Duration` can represent, still a valid sleep
        let mut clock = VirtualClock::new(vec![1.0e20, 1.0e21].into_iter()).unwrap();

        clock.sleep(2.0e19).unwrap();

        assert_eq!(clock.now(), 2.0e19);
        assert_eq!(clock.next_threshold(), 1.0e20);
        assert_eq!(clock.now_duration(), Duration::MAX);
    }

    #[test]
    fn test_landing_on_threshold_pulls() {
        let mut clock = VirtualClock::new(vec![5.0, 1.0].into_iter()).unwrap();

        clock.sleep(5.0).unwrap();

        assert_eq!(clock.now(), 5.0);
        assert_eq!(clock.next_threshold(), 6.0);
    }

    #[test]
    fn test_exhaustion_is_end_of_times() {
        let mut clock = VirtualClock::new(vec![1.0].into_iter()).unwrap();

        let err = clock.sleep(1.0).unwrap_err();

        assert_eq!(err, TimeError::EndOfTimes { now: 1.0, next: 1.0 });
        assert!(err.is_fatal());
        assert!(clock.is_halted());
        // The elapsed request is still reflected
        assert_eq!(clock.now(), 1.0);
    }

    #[test]
    fn test_halted_clock_stays_halted() {
        let pulls = Rc::new(RefCell::new(0));
        let counter = pulls.clone();
        let mut steps = vec![1.0].into_iter();
        let chronology = std::iter::from_fn(move || {
            *counter.borrow_mut() += 1;
            steps.next()
        });
        let mut clock = VirtualClock::new(chronology).unwrap();

        assert!(clock.sleep(3.0).is_err());
        assert!(matches!(clock.sleep(0.0), Err(TimeError::EndOfTimes { .. })));
        assert_eq!(*pulls.borrow(), 2);
    }

    #[test]
    fn test_negative_sleep_leaves_state() {
        let mut clock = VirtualClock::new(vec![5.0].into_iter()).unwrap();
        clock.sleep(1.5).unwrap();

        let err = clock.sleep(-1.0).unwrap_err();

        assert_eq!(err, TimeError::InvalidArgument { seconds: -1.0 });
        assert!(!err.is_fatal());
        assert_eq!(clock.now(), 1.5);
        assert_eq!(clock.next_threshold(), 5.0);
        assert!(!clock.is_halted());
    }

    #[test]
    fn test_invalid_step_halts() {
        let mut clock = VirtualClock::new(vec![1.0, -4.0].into_iter()).unwrap();

        let err = clock.sleep(2.0).unwrap_err();

        assert_eq!(err, TimeError::InvalidStep { step: -4.0 });
        assert!(clock.is_halted());
    }

    #[test]
    fn test_side_effects_run_in_production_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let mut steps = vec![1.0, 1.0, 1.0, 10.0].into_iter();
        let mut pulled = 0;
        let chronology = std::iter::from_fn(move || {
            sink.borrow_mut().push(pulled);
            pulled += 1;
            steps.next()
        });
        let mut clock = VirtualClock::new(chronology).unwrap();

        clock.sleep(3.5).unwrap();

        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
        assert_eq!(clock.next_threshold(), 13.0);
    }

    #[test]
    fn test_now_is_idempotent() {
        let mut clock = VirtualClock::new(std::iter::repeat(2.0)).unwrap();
        clock.sleep(3.0).unwrap();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now_duration(), Duration::from_secs(3));
    }

    #[test]
    fn test_sleep_for_duration() {
        let mut clock = VirtualClock::new(std::iter::repeat(1.0)).unwrap();
        clock.sleep_for(Duration::from_millis(2500)).unwrap();
        assert_eq!(clock.now(), 2.5);
        assert_eq!(clock.next_threshold(), 3.0);
    }

    #[test]
    #[should_panic(expected = "End of times")]
    fn test_advance_panics_on_exhaustion() {
        let mut clock = VirtualClock::new(vec![1.0].into_iter()).unwrap();
        clock.advance(5.0);
    }

    #[test]
    fn test_usable_through_clock_trait() {
        fn nap<T: Clock>(clock: &mut T) -> Result<f64, TimeError> {
            clock.sleep(0.25)?;
            Ok(clock.now())
        }

        let mut clock = VirtualClock::new(std::iter::repeat(1.0)).unwrap();
        assert_eq!(nap(&mut clock), Ok(0.25));
    }

    proptest! {
        #[test]
        fn prop_sleep_advances_exactly(sleeps in prop::collection::vec(0.0f64..50.0, 1..32)) {
            let mut clock = VirtualClock::new(std::iter::repeat(0.75)).unwrap();
            for seconds in sleeps {
                let before = clock.now();
                clock.sleep(seconds).unwrap();
                prop_assert_eq!(clock.now(), before + seconds);
                prop_assert!(clock.next_threshold() > clock.now());
            }
        }

        #[test]
        fn prop_negative_sleep_rejected(seconds in -1.0e6f64..-1.0e-9) {
            let mut clock = VirtualClock::new(std::iter::repeat(1.0)).unwrap();
            clock.sleep(2.0).unwrap();
            let before = (clock.now(), clock.next_threshold(), clock.draw_count());

            let rejected = matches!(clock.sleep(seconds), Err(TimeError::InvalidArgument { .. }));
            prop_assert!(rejected);
            prop_assert_eq!((clock.now(), clock.next_threshold(), clock.draw_count()), before);
        }

        #[test]
        fn prop_thresholds_never_decrease(steps in prop::collection::vec(0.0f64..5.0, 1..16), nap in 0.0f64..3.0) {
            let mut clock = VirtualClock::new(steps.into_iter().chain(std::iter::repeat(1.0))).unwrap();
            for _ in 0..8 {
                clock.sleep(nap).unwrap();
            }
            let trace = clock.trace();
            prop_assert!(trace.windows(2).all(|w| w[0].threshold <= w[1].threshold));
            prop_assert!(trace.windows(2).all(|w| w[0].at <= w[1].at));
        }
    }
}
