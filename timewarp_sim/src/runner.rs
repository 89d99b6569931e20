//! Scenario runner - executes the built-in timing scenarios.

use crate::chronology::{Periodic, Timeline};
use crate::clock::{Draw, VirtualClock};
use crate::jitter::Jitter;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld, WorldEvent};

use serde::{Deserialize, Serialize};
use timewarp_env::{retry, wait_until, Backoff, RetryError, TimeError};
use tracing::{debug, info, warn};

/// When the polled service comes up in TW-001.
const SERVICE_UP_AT_SECS: f64 = 7.3;

/// When the service accepts connections in TW-002.
const CONNECT_UP_AT_SECS: f64 = 5.0;

/// Heartbeat period of the world in TW-003.
const HEARTBEAT_SECS: f64 = 5.0;

/// Messages to wait for in TW-004.
const JITTER_ARRIVALS: u64 = 10;

/// Total scripted time in TW-005.
const SHORT_CHRONOLOGY: [f64; 3] = [1.0, 2.0, 3.0];

/// Step yielded once a scripted timeline has nothing left to do.
const IDLE_STEP_SECS: f64 = 60.0;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Final simulated time in seconds
    pub final_time_secs: f64,

    /// Chronology pulls, construction included
    pub draws: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// World events in firing order
    pub events: Vec<WorldEvent>,

    /// Every chronology pull
    pub trace: Vec<Draw>,
}

/// Runs timing scenarios against the virtual clock.
pub struct ScenarioRunner {
    config: SimConfig,
}

/// Outcome of one jittered run, compared across replays.
struct JitterRun {
    ready: bool,
    now: f64,
    trace: Vec<Draw>,
    world: SimWorld,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Sets the timeout of waiting scenarios.
    pub fn with_timeout(mut self, secs: f64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);

        match scenario {
            ScenarioId::Polling => self.run_polling(),
            ScenarioId::Backoff => self.run_backoff(),
            ScenarioId::Timeout => self.run_timeout(),
            ScenarioId::Jitter => self.run_jitter(),
            ScenarioId::Exhaustion => self.run_exhaustion(),
        }
    }

    /// TW-001: the service comes up between two polls.
    ///
    /// **Assertion**: the poller notices within one interval of the event.
    fn run_polling(&self) -> ScenarioResult {
        let world = SimWorld::new();
        let (init, handle) = (world.clone(), world.clone());
        let timeline = Timeline::new()
            .setup(move || init.set_service_up(0.0, false))
            .after(SERVICE_UP_AT_SECS, move |t| handle.set_service_up(t, true))
            .then_idle(IDLE_STEP_SECS);

        let mut clock = match VirtualClock::new(timeline) {
            Ok(clock) => clock,
            Err(err) => return self.aborted(ScenarioId::Polling, err),
        };

        let interval = self.config.poll_interval_secs;
        let observer = world.clone();
        let outcome = wait_until(&mut clock, interval, self.config.timeout_secs, || {
            observer.service_up()
        });

        let failure = match outcome {
            Ok(true) => {
                let now = clock.now();
                if now < SERVICE_UP_AT_SECS || now > SERVICE_UP_AT_SECS + interval {
                    Some(format!(
                        "noticed service at t={:.3}s, expected within {}s of t={}s",
                        now, interval, SERVICE_UP_AT_SECS
                    ))
                } else {
                    None
                }
            }
            Ok(false) => Some(format!("gave up after {}s", self.config.timeout_secs)),
            Err(err) => Some(err.to_string()),
        };

        self.finish(ScenarioId::Polling, clock, &world, failure)
    }

    /// TW-002: connect with exponential backoff.
    ///
    /// **Assertion**: success lands on the first attempt scheduled at or
    /// after the service came up.
    fn run_backoff(&self) -> ScenarioResult {
        let world = SimWorld::new();
        let handle = world.clone();
        let timeline = Timeline::new()
            .after(CONNECT_UP_AT_SECS, move |t| handle.set_service_up(t, true))
            .then_idle(IDLE_STEP_SECS);

        let mut clock = match VirtualClock::new(timeline) {
            Ok(clock) => clock,
            Err(err) => return self.aborted(ScenarioId::Backoff, err),
        };

        let backoff = &self.config.backoff;
        let expected = first_attempt_after(backoff, CONNECT_UP_AT_SECS);
        let observer = world.clone();
        let outcome = retry(&mut clock, backoff, |attempt| {
            if observer.service_up() {
                Ok(attempt)
            } else {
                debug!(attempt, "connection refused");
                Err("connection refused")
            }
        });

        let failure = match (outcome, expected) {
            (Ok(attempt), Some((want_attempt, want_at))) => {
                if attempt == want_attempt && clock.now() == want_at {
                    None
                } else {
                    Some(format!(
                        "connected on attempt {} at t={}s, expected attempt {} at t={}s",
                        attempt,
                        clock.now(),
                        want_attempt,
                        want_at
                    ))
                }
            }
            (Ok(attempt), None) => Some(format!(
                "connected on attempt {} although the policy should run out first",
                attempt
            )),
            (Err(RetryError::Exhausted { .. }), None) => None,
            (Err(err), _) => Some(err.to_string()),
        };

        self.finish(ScenarioId::Backoff, clock, &world, failure)
    }

    /// TW-003: the service never comes up.
    ///
    /// **Assertion**: the poller gives up exactly at the deadline.
    fn run_timeout(&self) -> ScenarioResult {
        let world = SimWorld::new();
        let handle = world.clone();
        let ticker = Periodic::new(HEARTBEAT_SECS)
            .on_tick(move |k| handle.record(k as f64 * HEARTBEAT_SECS, "heartbeat"));

        let mut clock = match VirtualClock::new(ticker) {
            Ok(clock) => clock,
            Err(err) => return self.aborted(ScenarioId::Timeout, err),
        };

        let timeout = self.config.timeout_secs;
        let observer = world.clone();
        let outcome = wait_until(&mut clock, self.config.poll_interval_secs, timeout, || {
            observer.service_up()
        });

        let failure = match outcome {
            Ok(false) if (clock.now() - timeout).abs() < 1e-9 => None,
            Ok(false) => Some(format!(
                "gave up at t={}s, expected t={}s",
                clock.now(),
                timeout
            )),
            Ok(true) => Some("service reported up but was never started".to_string()),
            Err(err) => Some(err.to_string()),
        };

        self.finish(ScenarioId::Timeout, clock, &world, failure)
    }

    /// TW-004: jittered arrivals.
    ///
    /// **Assertion**: all messages arrive, and a replay with the same seed
    /// produces the identical timeline.
    fn run_jitter(&self) -> ScenarioResult {
        let (first, replay) = match (self.jitter_once(), self.jitter_once()) {
            (Ok(first), Ok(replay)) => (first, replay),
            (Err(err), _) | (_, Err(err)) => return self.aborted(ScenarioId::Jitter, err),
        };

        let failure = if !first.ready {
            Some(format!(
                "only {} of {} messages arrived within {}s",
                first.world.deliveries(),
                JITTER_ARRIVALS,
                self.config.timeout_secs
            ))
        } else if first.now != replay.now || first.trace != replay.trace {
            Some(format!(
                "replay diverged: t={}s vs t={}s",
                first.now, replay.now
            ))
        } else {
            None
        };

        if let Some(reason) = &failure {
            warn!("✗ {}: {}", ScenarioId::Jitter, reason);
        }

        ScenarioResult {
            scenario: ScenarioId::Jitter,
            seed: self.config.seed,
            passed: failure.is_none(),
            final_time_secs: first.now,
            draws: first.trace.len(),
            failure_reason: failure,
            events: first.world.events(),
            trace: first.trace,
        }
    }

    fn jitter_once(&self) -> Result<JitterRun, TimeError> {
        let world = SimWorld::new();
        let sink = world.clone();
        let mut gaps = Jitter::new(
            self.config.seed,
            self.config.jitter_min_secs,
            self.config.jitter_max_secs,
        )?;
        debug!(seed = gaps.seed(), "jittered arrivals");

        // Every pull after the first is a message landing
        let mut elapsed = 0.0;
        let mut started = false;
        let arrivals = std::iter::from_fn(move || {
            if started {
                let n = sink.deliver();
                sink.record(elapsed, format!("message {}", n));
            }
            started = true;
            let gap = gaps.next()?;
            elapsed += gap;
            Some(gap)
        });

        let mut clock = VirtualClock::new(arrivals)?;
        let observer = world.clone();
        let ready = wait_until(
            &mut clock,
            self.config.poll_interval_secs,
            self.config.timeout_secs,
            || observer.deliveries() >= JITTER_ARRIVALS,
        )?;

        Ok(JitterRun {
            ready,
            now: clock.now(),
            trace: clock.into_trace(),
            world,
        })
    }

    /// TW-005: the chronology is scripted shorter than the wait.
    ///
    /// **Assertion**: the clock fails with end of times instead of
    /// returning stale time.
    fn run_exhaustion(&self) -> ScenarioResult {
        let world = SimWorld::new();
        let mut clock = match VirtualClock::new(SHORT_CHRONOLOGY.into_iter()) {
            Ok(clock) => clock,
            Err(err) => return self.aborted(ScenarioId::Exhaustion, err),
        };

        let outcome = wait_until(
            &mut clock,
            self.config.poll_interval_secs,
            self.config.timeout_secs,
            || false,
        );

        let failure = match outcome {
            Err(TimeError::EndOfTimes { now, .. }) => {
                world.record(now, "end of times");
                if clock.is_halted() {
                    None
                } else {
                    Some("end of times reported but clock still running".to_string())
                }
            }
            Err(err) => Some(format!("expected end of times, got: {}", err)),
            Ok(ready) => Some(format!(
                "wait returned {} at t={}s without exhausting the chronology",
                ready,
                clock.now()
            )),
        };

        self.finish(ScenarioId::Exhaustion, clock, &world, failure)
    }

    fn finish<C>(
        &self,
        scenario: ScenarioId,
        clock: VirtualClock<C>,
        world: &SimWorld,
        failure: Option<String>,
    ) -> ScenarioResult {
        match &failure {
            Some(reason) => warn!("✗ {}: {}", scenario, reason),
            None => debug!("{} finished at t={}s", scenario, clock.now()),
        }

        ScenarioResult {
            scenario,
            seed: self.config.seed,
            passed: failure.is_none(),
            final_time_secs: clock.now(),
            draws: clock.draw_count(),
            failure_reason: failure,
            events: world.events(),
            trace: clock.into_trace(),
        }
    }

    fn aborted(&self, scenario: ScenarioId, err: TimeError) -> ScenarioResult {
        warn!("✗ {}: could not start: {}", scenario, err);

        ScenarioResult {
            scenario,
            seed: self.config.seed,
            passed: false,
            final_time_secs: 0.0,
            draws: 0,
            failure_reason: Some(err.to_string()),
            events: Vec::new(),
            trace: Vec::new(),
        }
    }
}

/// Returns the attempt index and time of the first retry scheduled at or
/// after `up_at`, or `None` if the policy runs out first.
fn first_attempt_after(backoff: &Backoff, up_at: f64) -> Option<(u32, f64)> {
    let mut at = 0.0;
    for attempt in 0..backoff.max_attempts.max(1) {
        if at >= up_at {
            return Some((attempt, at));
        }
        at += backoff.delay(attempt);
    }
    None
}
