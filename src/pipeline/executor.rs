//! Work-unit executor and configuration error aggregation
//!
//! Units are installed one by one; every configuration problem is collected.
//! `execute` refuses to spawn anything while any error is pending, then runs
//! the units one after another. A failing unit never stops the next one.

use crate::config::{ToolchainConfig, WorkUnit, WorkUnitSpec};
use crate::errors::{AggregateConfigError, ConfigurationError, PipelineError};

use super::{Pipeline, UnitOutcome};

/// Collects work units and their configuration errors.
#[derive(Debug, Default)]
pub struct UnitExecutor {
    errors: Vec<ConfigurationError>,
    units: Vec<WorkUnit>,
    /// Specs seen so far, used to name anonymous units
    installed: usize,
}

impl UnitExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the toolchain's own validation errors, if any.
    pub fn for_toolchain(config: &ToolchainConfig) -> Self {
        Self {
            errors: config.validate(),
            ..Self::default()
        }
    }

    pub fn add_error(&mut self, error: ConfigurationError) {
        self.errors.push(error);
    }

    /// Validate `spec` and queue it, or record its errors.
    pub fn install(&mut self, spec: WorkUnitSpec) {
        let index = self.installed;
        self.installed += 1;
        match spec.validate(index) {
            Ok(unit) => self.units.push(unit),
            Err(errors) => self.errors.extend(errors),
        }
    }

    pub fn pending_errors(&self) -> &[ConfigurationError] {
        &self.errors
    }

    /// Fail with every pending error, or hand back the queued units.
    pub fn into_units(self) -> Result<Vec<WorkUnit>, AggregateConfigError> {
        if self.errors.is_empty() {
            Ok(self.units)
        } else {
            Err(AggregateConfigError::new(self.errors))
        }
    }

    /// Run every unit in installation order.
    pub fn execute(mut self, pipeline: &Pipeline<'_>) -> Result<RunSummary, PipelineError> {
        if let Err(error) = pipeline.check_launcher() {
            self.errors.push(error);
        }
        let units = self.into_units()?;
        tracing::info!(units = units.len(), "starting run");
        let outcomes = units.iter().map(|unit| pipeline.run_unit(unit)).collect();
        Ok(RunSummary { outcomes })
    }
}

/// Outcomes of every unit of a run, in order.
#[derive(Debug)]
pub struct RunSummary {
    pub outcomes: Vec<UnitOutcome>,
}

impl RunSummary {
    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}
