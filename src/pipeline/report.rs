//! Per-unit run report.
//!
//! Written as JSON next to the tool artifacts once a unit finishes or aborts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use super::Stage;
use crate::driver::DriverKind;
use crate::tools::ArtifactNames;

pub const REPORT_FILE_NAME: &str = "daikon-runner-report.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub millis: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub unit: String,
    pub main_class: Option<String>,
    /// Set only when the driver was generated
    pub driver_kind: Option<DriverKind>,
    pub generated_source: Option<PathBuf>,
    /// Last stage entered, or `done` / `aborted`
    pub last_stage: Stage,
    /// Stage in which the unit aborted
    pub failed_stage: Option<Stage>,
    pub stages: Vec<StageTiming>,
    pub artifacts: Option<ArtifactNames>,
    pub abort_reason: Option<String>,
}

impl RunReport {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            main_class: None,
            driver_kind: None,
            generated_source: None,
            last_stage: Stage::Discover,
            failed_stage: None,
            stages: Vec::new(),
            artifacts: None,
            abort_reason: None,
        }
    }

    pub fn enter(&mut self, stage: Stage) {
        tracing::info!(%stage, "stage started");
        self.last_stage = stage;
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        self.stages.push(StageTiming {
            stage,
            millis: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
    }

    pub fn finish(&mut self) {
        self.last_stage = Stage::Done;
    }

    pub fn abort(&mut self, reason: String) {
        self.failed_stage = Some(self.last_stage);
        self.last_stage = Stage::Aborted;
        self.abort_reason = Some(reason);
    }

    pub fn is_done(&self) -> bool {
        self.last_stage == Stage::Done
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write `<dir>/daikon-runner-report.json`. Failures are logged, never returned.
    pub fn write_best_effort(&self, dir: &Path) -> Option<PathBuf> {
        let path = dir.join(REPORT_FILE_NAME);
        let result = self
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|e| e.to_string()));
        match result {
            Ok(()) => Some(path),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "could not write run report");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_remembers_failed_stage() {
        let mut report = RunReport::new("core");
        report.enter(Stage::Tracing);
        report.abort("Chicory failed".into());
        assert_eq!(report.last_stage, Stage::Aborted);
        assert_eq!(report.failed_stage, Some(Stage::Tracing));
        assert!(!report.is_done());
    }

    #[test]
    fn test_json_shape() {
        let mut report = RunReport::new("core");
        report.main_class = Some("com.foo.driver.TestDriver".into());
        report.driver_kind = Some(DriverKind::JUnit4);
        report.record(Stage::Discover, Duration::from_millis(12));
        report.finish();

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["unit"], "core");
        assert_eq!(value["last_stage"], "done");
        assert_eq!(value["driver_kind"], "junit4");
        assert_eq!(value["stages"][0]["stage"], "discover");
        assert_eq!(value["stages"][0]["millis"], 12);
        assert!(value["abort_reason"].is_null());
    }

    #[test]
    fn test_write_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let report = RunReport::new("core");
        let path = report.write_best_effort(dir.path()).unwrap();
        assert!(path.ends_with(REPORT_FILE_NAME));

        // Missing directory: logged and ignored.
        assert!(report.write_best_effort(&dir.path().join("missing")).is_none());
    }
}
