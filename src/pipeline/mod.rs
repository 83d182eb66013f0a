//! Pipeline orchestration
//!
//! Each work unit moves through a strictly linear state machine:
//!
//! ```text
//! discover -> resolve-driver -> comparability -> tracing -> inference -> done
//!     \             \                 \              \           \
//!      +-------------+-----------------+--------------+-----------+--> aborted
//! ```
//!
//! Stages hand data to each other only through the output directory, using the
//! file names in [`ArtifactNames`]. Nothing is retried and nothing is rolled
//! back: artifacts of completed stages stay in place after an abort.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod executor;
pub mod report;

pub use executor::{RunSummary, UnitExecutor};
pub use report::{RunReport, StageTiming};

use std::fmt;
use std::fs;
use std::time::Instant;

use serde::Serialize;

use crate::catalog::ClassCatalog;
use crate::config::{ToolchainConfig, WorkUnit};
use crate::driver::{DriverGenerator, DriverSpec, GeneratedArtifact, SourceScanner, TestMethodScanner};
use crate::errors::{ConfigurationError, PipelineError};
use crate::process::ProcessRunner;
use crate::tools::{ArtifactNames, ToolInvocation, ToolKind, ToolOptions};

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Discover,
    ResolveDriver,
    Comparability,
    Tracing,
    Inference,
    Done,
    Aborted,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Discover => "discover",
            Stage::ResolveDriver => "resolve-driver",
            Stage::Comparability => "comparability",
            Stage::Tracing => "tracing",
            Stage::Inference => "inference",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Aborted)
    }
}

impl From<ToolKind> for Stage {
    fn from(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Comparability => Stage::Comparability,
            ToolKind::Tracing => Stage::Tracing,
            ToolKind::Inference => Stage::Inference,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the driver class was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDriver {
    /// Fully-qualified driver class
    pub main_class: String,
    /// Present when the driver was synthesized for this run
    pub generated: Option<GeneratedArtifact>,
}

/// What a unit ended with.
#[derive(Debug)]
pub struct UnitOutcome {
    pub report: RunReport,
    pub result: Result<ArtifactNames, PipelineError>,
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs work units against one toolchain.
pub struct Pipeline<'a> {
    config: &'a ToolchainConfig,
    runner: &'a dyn ProcessRunner,
    scanner: Box<dyn TestMethodScanner + 'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ToolchainConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            config,
            runner,
            scanner: Box::new(SourceScanner::new(config.test_annotation.clone())),
        }
    }

    /// Replace the test-method scanner
    pub fn with_scanner(mut self, scanner: impl TestMethodScanner + 'a) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    /// One error for the whole run when the JVM launcher cannot be started.
    pub fn check_launcher(&self) -> Result<(), ConfigurationError> {
        if self.runner.can_launch(&self.config.launcher) {
            Ok(())
        } else {
            Err(ConfigurationError::LauncherNotFound {
                program: self.config.launcher.clone(),
            })
        }
    }

    /// Run every stage of `unit`, stopping at the first failure.
    pub fn run_unit(&self, unit: &WorkUnit) -> UnitOutcome {
        let span = tracing::info_span!("work_unit", unit = %unit.name);
        let _guard = span.enter();

        let mut report = RunReport::new(&unit.name);
        let result = self.drive(unit, &mut report);
        match &result {
            Ok(_) => {
                report.finish();
                tracing::info!("work unit finished");
            }
            Err(error) => {
                report.abort(error.to_string());
                tracing::error!(stage = ?report.failed_stage, %error, "work unit aborted");
            }
        }
        report.write_best_effort(&unit.output_dir);
        UnitOutcome { report, result }
    }

    fn drive(&self, unit: &WorkUnit, report: &mut RunReport) -> Result<ArtifactNames, PipelineError> {
        fs::create_dir_all(&unit.output_dir).map_err(|source| PipelineError::OutputDir {
            unit: unit.name.clone(),
            path: unit.output_dir.clone(),
            source,
        })?;

        let catalog = timed(report, Stage::Discover, || self.discover(unit))?;
        let driver = timed(report, Stage::ResolveDriver, || self.resolve_driver(unit, &catalog))?;

        report.main_class = Some(driver.main_class.clone());
        if let Some(generated) = &driver.generated {
            report.driver_kind = Some(generated.kind);
            report.generated_source = Some(generated.source_file.clone());
        }

        let artifacts = ArtifactNames::new(&unit.output_dir, &driver.main_class);
        report.artifacts = Some(artifacts.clone());

        for kind in ToolKind::ALL {
            let stage = Stage::from(kind);
            let invocation = self.invocation(kind, unit, &driver.main_class, &catalog, &artifacts);
            timed(report, stage, || invocation.execute(self.runner, self.config)).map_err(|source| {
                PipelineError::ToolExecution {
                    unit: unit.name.clone(),
                    stage,
                    source,
                }
            })?;
        }
        Ok(artifacts)
    }

    /// Build the class catalog of `unit`.
    pub fn discover(&self, unit: &WorkUnit) -> Result<ClassCatalog, PipelineError> {
        ClassCatalog::scan(&unit.classes_dir, &self.config.class_root_marker, &self.config.synthetic_marker).map_err(
            |source| PipelineError::Catalog {
                unit: unit.name.clone(),
                path: unit.classes_dir.clone(),
                source,
            },
        )
    }

    /// Test classes of `unit` paired with their test methods.
    pub fn driver_spec(&self, unit: &WorkUnit, catalog: &ClassCatalog, package: &str) -> Result<DriverSpec, PipelineError> {
        let tests = catalog.test_classes(&self.config.driver_class_name);
        DriverSpec::build(package, &tests, unit.test_sources.as_deref(), self.scanner.as_ref()).map_err(|source| {
            PipelineError::Generation {
                unit: unit.name.clone(),
                source,
            }
        })
    }

    /// Find the driver by convention, or generate one when a package is configured.
    ///
    /// A configured package always wins over a discovered driver.
    pub fn resolve_driver(&self, unit: &WorkUnit, catalog: &ClassCatalog) -> Result<ResolvedDriver, PipelineError> {
        let shape = self
            .config
            .driver_name_regex()
            .map_err(|e| PipelineError::DriverResolution {
                unit: unit.name.clone(),
                reason: e.to_string(),
            })?;
        let discovered = catalog.find_driver(&shape, &self.config.driver_class_name);

        if let Some(package) = &unit.driver_package {
            if let Some(existing) = discovered {
                tracing::info!(existing, "driver package configured; generating a new driver instead");
            }
            let spec = self.driver_spec(unit, catalog, package)?;
            let artifact = DriverGenerator::new(self.config, self.runner)
                .generate(&spec, unit)
                .map_err(|source| PipelineError::Generation {
                    unit: unit.name.clone(),
                    source,
                })?;
            return Ok(ResolvedDriver {
                main_class: artifact.main_class.clone(),
                generated: Some(artifact),
            });
        }

        match discovered {
            Some(name) => {
                tracing::info!(driver = name, "using existing driver");
                Ok(ResolvedDriver {
                    main_class: name.to_string(),
                    generated: None,
                })
            }
            None => Err(PipelineError::DriverResolution {
                unit: unit.name.clone(),
                reason: format!(
                    "no class named `*{}` was found and no driver package is configured",
                    self.config.driver_class_name
                ),
            }),
        }
    }

    /// Invocation of one tool for `unit`.
    pub fn invocation(
        &self,
        kind: ToolKind,
        unit: &WorkUnit,
        main_class: &str,
        catalog: &ClassCatalog,
        artifacts: &ArtifactNames,
    ) -> ToolInvocation {
        let mut options = ToolOptions {
            main_class: Some(main_class.to_string()),
            extra_args: unit.extra_args.clone(),
            ..ToolOptions::default()
        };
        let working_dir = match kind {
            ToolKind::Comparability => {
                options.select_patterns = catalog.names().map(str::to_string).collect();
                options.omit_patterns = unit.omit_patterns.clone();
                options.output_dir = Some(unit.output_dir.clone());
                &unit.classes_dir
            }
            ToolKind::Tracing => {
                options.select_patterns = catalog.names().map(str::to_string).collect();
                options.omit_patterns = unit.omit_patterns.clone();
                options.comparability_file = Some(artifacts.comparability_file.clone());
                &unit.output_dir
            }
            ToolKind::Inference => {
                options.trace_file = Some(artifacts.trace_file.clone());
                options.invariant_file = Some(artifacts.invariant_file.clone());
                &unit.classes_dir
            }
        };
        ToolInvocation::new(kind, unit.classpath.clone(), working_dir, options)
    }
}

/// Enter `stage`, run `f`, and record how long it took.
fn timed<T>(report: &mut RunReport, stage: Stage, f: impl FnOnce() -> T) -> T {
    report.enter(stage);
    let started = Instant::now();
    let value = f();
    report.record(stage, started.elapsed());
    value
}
