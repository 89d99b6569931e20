//! Built-in timing scenarios.

use serde::{Deserialize, Serialize};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// TW-001: Poll a dependency that comes up mid-wait
    Polling,

    /// TW-002: Retry a failing call with exponential backoff
    Backoff,

    /// TW-003: Give up on a dependency that never comes up
    Timeout,

    /// TW-004: Jittered message arrivals, replayed from the seed
    Jitter,

    /// TW-005: Scripted chronology too short for the wait
    Exhaustion,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Polling,
            ScenarioId::Backoff,
            ScenarioId::Timeout,
            ScenarioId::Jitter,
            ScenarioId::Exhaustion,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Polling => "polling",
            ScenarioId::Backoff => "backoff",
            ScenarioId::Timeout => "timeout",
            ScenarioId::Jitter => "jitter",
            ScenarioId::Exhaustion => "exhaustion",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Polling => "Service comes up at t=7.3s, poller must notice on the next tick",
            ScenarioId::Backoff => "Connect retries with exponential backoff until the service is up",
            ScenarioId::Timeout => "Service never comes up, poller must give up exactly at the deadline",
            ScenarioId::Jitter => "Random arrival gaps from a seeded RNG, two runs must match",
            ScenarioId::Exhaustion => "Chronology runs out mid-wait, clock must report end of times",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "polling" | "poll" | "tw-001" => Ok(ScenarioId::Polling),
            "backoff" | "retry" | "tw-002" => Ok(ScenarioId::Backoff),
            "timeout" | "tw-003" => Ok(ScenarioId::Timeout),
            "jitter" | "tw-004" => Ok(ScenarioId::Jitter),
            "exhaustion" | "end_of_times" | "tw-005" => Ok(ScenarioId::Exhaustion),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
