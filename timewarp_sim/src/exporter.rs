//! JSON exporter for scenario reports.
//!
//! Writes scenario results, including every chronology pull, so a failing
//! seed can be inspected offline.

use crate::runner::ScenarioResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Base seed of the run
    pub seed: u64,

    /// Number of scenario runs
    pub total: usize,

    /// Number of passing runs
    pub passed: usize,

    /// Number of failing runs
    pub failed: usize,

    /// All results in execution order
    pub results: Vec<ScenarioResult>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            total: 0,
            passed: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    /// Adds a result and updates the tallies.
    pub fn add_result(&mut self, result: ScenarioResult) {
        self.total += 1;
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// Returns the failing results.
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Serializes the export as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScenarioRunner;
    use crate::scenarios::ScenarioId;
    use crate::world::SimConfig;

    #[test]
    fn test_export_tallies_results() {
        let runner = ScenarioRunner::new(SimConfig::default());
        let mut export = SimExport::new(42);

        export.add_result(runner.run(ScenarioId::Polling));
        export.add_result(runner.with_timeout(1.0).run(ScenarioId::Polling));

        assert_eq!(export.total, 2);
        assert_eq!(export.passed, 1);
        assert_eq!(export.failed, 1);
        assert_eq!(export.failures().count(), 1);
    }

    #[test]
    fn test_export_json_carries_trace() {
        let runner = ScenarioRunner::new(SimConfig::default());
        let mut export = SimExport::new(42);
        export.add_result(runner.run(ScenarioId::Exhaustion));

        let json: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();

        assert_eq!(json["results"][0]["scenario"], "exhaustion");
        assert_eq!(json["results"][0]["trace"].as_array().unwrap().len(), 3);
        assert_eq!(json["results"][0]["trace"][1]["threshold"], 3.0);
    }
}
