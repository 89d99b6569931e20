//! SimWorld - the shared fixture a chronology mutates.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use timewarp_env::Backoff;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Polling interval used by waiting scenarios, in seconds
    pub poll_interval_secs: f64,

    /// Timeout used by waiting scenarios, in seconds
    pub timeout_secs: f64,

    /// Backoff policy for retry scenarios
    pub backoff: Backoff,

    /// Bounds of the jittered chronology, in seconds
    pub jitter_min_secs: f64,
    pub jitter_max_secs: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            poll_interval_secs: 0.5,
            timeout_secs: 30.0,
            backoff: Backoff {
                initial: 1.0,
                factor: 2.0,
                max_delay: 8.0,
                max_attempts: 6,
            },
            jitter_min_secs: 0.1,
            jitter_max_secs: 2.0,
        }
    }
}

/// Something that happened in the simulated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Simulated time of the event in seconds
    pub time_secs: f64,

    pub message: String,
}

/// Mutable state observed by the code under test.
#[derive(Debug, Default)]
pub struct WorldState {
    /// Whether the simulated dependency is accepting requests
    pub service_up: bool,

    /// Messages delivered so far
    pub deliveries: u64,

    /// Event log in firing order
    pub events: Vec<WorldEvent>,
}

/// Cloneable handle to the shared world state.
///
/// Chronology actions capture a clone and mutate the world when simulated
/// time crosses their threshold; the code under test reads the same state.
#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    state: Arc<Mutex<WorldState>>,
}

impl SimWorld {
    /// Creates an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event to the log.
    pub fn record(&self, time_secs: f64, message: impl Into<String>) {
        self.lock().events.push(WorldEvent {
            time_secs,
            message: message.into(),
        });
    }

    /// Brings the simulated service up or down.
    pub fn set_service_up(&self, time_secs: f64, up: bool) {
        self.lock().service_up = up;
        self.record(time_secs, if up { "service up" } else { "service down" });
    }

    /// Returns true if the simulated service is up.
    pub fn service_up(&self) -> bool {
        self.lock().service_up
    }

    /// Records one delivered message and returns the running total.
    pub fn deliver(&self) -> u64 {
        let mut state = self.lock();
        state.deliveries += 1;
        state.deliveries
    }

    /// Returns the number of delivered messages.
    pub fn deliveries(&self) -> u64 {
        self.lock().deliveries
    }

    /// Returns a copy of the event log.
    pub fn events(&self) -> Vec<WorldEvent> {
        self.lock().events.clone()
    }

    /// Resets the world to its initial state.
    pub fn reset(&self) {
        *self.lock() = WorldState::default();
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_clones_share_state() {
        let world = SimWorld::new();
        let handle = world.clone();

        handle.set_service_up(3.0, true);

        assert!(world.service_up());
        assert_eq!(
            world.events(),
            vec![WorldEvent {
                time_secs: 3.0,
                message: "service up".to_string()
            }]
        );
    }

    #[test]
    fn test_world_counts_deliveries() {
        let world = SimWorld::new();
        assert_eq!(world.deliver(), 1);
        assert_eq!(world.deliver(), 2);
        assert_eq!(world.deliveries(), 2);

        world.reset();
        assert_eq!(world.deliveries(), 0);
        assert!(world.events().is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.seed, 42);
        assert!(config.poll_interval_secs < config.timeout_secs);
        assert!(config.jitter_min_secs <= config.jitter_max_secs);
    }
}
