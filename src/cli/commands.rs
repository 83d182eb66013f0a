//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::{Path, PathBuf};

use crate::catalog::ClassCatalog;
use crate::classpath::{self, ClasspathSet};
use crate::config::{Manifest, ToolchainConfig, WorkUnit, WorkUnitSpec};
use crate::driver::DriverGenerator;
use crate::errors::{AggregateConfigError, PipelineError};
use crate::pipeline::{Pipeline, UnitExecutor};
use crate::process::{self, SystemProcessRunner};

use super::{CliError, CliResult, ExitCode, ToolchainArgs, UnitArgs};

const DAIKON_RELEASES: &str = "https://github.com/codespecs/daikon/releases";

// ============================================================================
// Work unit sources
// ============================================================================

/// Toolchain and unit specs from a manifest or from flags (never both).
fn load_units(
    manifest: Option<&Path>,
    unit: UnitArgs,
    toolchain: ToolchainArgs,
) -> CliResult<(ToolchainConfig, Vec<WorkUnitSpec>)> {
    let (config, specs) = match manifest {
        Some(_) if unit.is_set() => {
            return Err(CliError::failure(
                "Error: work unit flags cannot be combined with --manifest",
            ));
        }
        Some(path) => {
            let manifest = Manifest::load(path)
                .map_err(|e| CliError::diagnostic(PipelineError::from(AggregateConfigError::new(vec![e]))))?;
            if manifest.units.is_empty() {
                return Err(CliError::failure(format!(
                    "Error: manifest {} declares no [[unit]]",
                    path.display()
                )));
            }
            (manifest.toolchain, manifest.units)
        }
        None => (ToolchainConfig::default(), vec![unit.into_spec()]),
    };
    Ok((toolchain.apply(config), specs))
}

// ============================================================================
// Commands
// ============================================================================

/// `run`: validate every unit up front, then drive each one in turn.
pub fn run_units(manifest: Option<&Path>, unit: UnitArgs, toolchain: ToolchainArgs) -> CliResult<ExitCode> {
    let (config, specs) = load_units(manifest, unit, toolchain)?;

    let mut executor = UnitExecutor::for_toolchain(&config);
    for spec in specs {
        executor.install(spec);
    }

    let runner = SystemProcessRunner;
    let pipeline = Pipeline::new(&config, &runner);
    let summary = executor.execute(&pipeline).map_err(CliError::diagnostic)?;

    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(artifacts) => println!(
                "{}: done, invariants in {}",
                outcome.report.unit,
                artifacts.invariant_file.display()
            ),
            Err(_) => println!("{}: aborted at {}", outcome.report.unit, outcome.report.last_stage),
        }
    }

    let failures: Vec<String> = summary
        .outcomes
        .into_iter()
        .filter_map(|o| o.result.err())
        .map(|e| format!("{:?}", miette::Report::new(e)))
        .collect();
    if failures.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Err(CliError::failure(failures.join("\n")))
    }
}

/// `check`: the tool jar must be on the classpath.
pub fn check_installation(entries: &[PathBuf], requires: Option<&Path>) -> CliResult<ExitCode> {
    let config = ToolchainConfig::default();
    let mut classpath: ClasspathSet = entries.iter().cloned().collect();
    if let Some(dir) = requires {
        let jars = classpath::jars_in(dir)
            .map_err(|e| CliError::failure(format!("Error: cannot list jars in {}: {e}", dir.display())))?;
        classpath.extend(jars);
    }

    if !classpath.has_file_named(&config.tool_jar_name) {
        return Err(CliError::failure(format!(
            "Error: {} is not on the classpath. Download it from {DAIKON_RELEASES}",
            config.tool_jar_name
        )));
    }
    if !process::program_exists(&config.launcher) {
        tracing::warn!(launcher = %config.launcher, "JVM launcher not found on PATH");
    }
    println!("{} found on the classpath", config.tool_jar_name);
    Ok(ExitCode::SUCCESS)
}

/// `generate`: discover classes and produce the driver for every unit with a driver package.
pub fn generate_drivers(
    manifest: Option<&Path>,
    unit: UnitArgs,
    toolchain: ToolchainArgs,
    print: bool,
) -> CliResult<ExitCode> {
    let (config, specs) = load_units(manifest, unit, toolchain)?;

    let mut executor = UnitExecutor::for_toolchain(&config);
    for spec in specs {
        executor.install(spec);
    }
    let units = executor
        .into_units()
        .map_err(|e| CliError::diagnostic(PipelineError::from(e)))?;

    let runner = SystemProcessRunner;
    let pipeline = Pipeline::new(&config, &runner);
    let generator = DriverGenerator::new(&config, &runner);

    let mut generated = 0;
    let mut failures = Vec::new();
    for unit in &units {
        let Some(package) = &unit.driver_package else {
            tracing::info!(unit = %unit.name, "no driver package configured; skipped");
            continue;
        };
        match generate_one(&pipeline, &generator, unit, package, print) {
            Ok(()) => generated += 1,
            Err(error) => {
                tracing::error!(unit = %unit.name, %error, "driver generation failed");
                failures.push(format!("{:?}", miette::Report::new(error)));
            }
        }
    }

    if !failures.is_empty() {
        return Err(CliError::failure(failures.join("\n")));
    }
    if generated == 0 {
        return Err(CliError::failure("Error: no work unit has a driver package; nothing to generate"));
    }
    Ok(ExitCode::SUCCESS)
}

fn generate_one(
    pipeline: &Pipeline<'_>,
    generator: &DriverGenerator<'_>,
    unit: &WorkUnit,
    package: &str,
    print: bool,
) -> Result<(), PipelineError> {
    let catalog = pipeline.discover(unit)?;
    let spec = pipeline.driver_spec(unit, &catalog, package)?;

    if print {
        print!("{}", generator.render(&spec, generator.kind_for(unit)));
    } else {
        let artifact = generator
            .generate(&spec, unit)
            .map_err(|source| PipelineError::Generation {
                unit: unit.name.clone(),
                source,
            })?;
        println!("{}: {} -> {}", unit.name, artifact.main_class, artifact.source_file.display());
    }
    Ok(())
}

/// `catalog`: print discovered class names, one per line.
pub fn list_catalog(classes_dir: &Path, marker: Option<&str>) -> CliResult<ExitCode> {
    let config = ToolchainConfig::default();
    let marker = marker.unwrap_or(&config.class_root_marker);
    let catalog = ClassCatalog::scan(classes_dir, marker, &config.synthetic_marker)
        .map_err(|e| CliError::failure(format!("Error: cannot scan {}: {e}", classes_dir.display())))?;

    for name in catalog.names() {
        println!("{name}");
    }
    if catalog.is_empty() {
        eprintln!("No classes found under `{marker}` in {}", classes_dir.display());
    }
    Ok(ExitCode::SUCCESS)
}
