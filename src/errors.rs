//! Error taxonomy
//!
//! - `ConfigurationError`: found before anything runs; many are aggregated.
//! - `ToolError`: an external tool could not run or reported a known marker.
//! - `GenerationError`: writing or compiling the synthesized driver failed.
//! - `PipelineError`: what a work unit (or the whole run) ultimately reports.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::pipeline::Stage;
use crate::process::ProcessError;

// ============================================================================
// Configuration
// ============================================================================

/// A problem with user-supplied options, detected before any process runs.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("work unit `{unit}`: classpath is missing or empty")]
    MissingClasspath { unit: String },

    #[error("work unit `{unit}`: classes directory is missing")]
    MissingClassesDir { unit: String },

    #[error("work unit `{unit}`: classes directory {} does not exist", .path.display())]
    ClassesDirNotFound { unit: String, path: PathBuf },

    #[error("work unit `{unit}`: output directory is missing")]
    MissingOutputDir { unit: String },

    #[error("work unit `{unit}`: `{package}` is not a valid Java package name")]
    InvalidDriverPackage { unit: String, package: String },

    #[error("work unit `{unit}`: omit pattern `{pattern}` is not a valid regex")]
    InvalidOmitPattern {
        unit: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("work unit `{unit}`: cannot list jars in {}", .path.display())]
    RequiresUnreadable {
        unit: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("driver name pattern `{pattern}` is not a valid regex")]
    InvalidDriverNamePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("driver class name `{name}` is not a Java identifier")]
    InvalidDriverClassName { name: String },

    #[error("JVM launcher `{program}` was not found")]
    LauncherNotFound { program: String },

    #[error("cannot read manifest {}", .path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("manifest {} is too large ({size} bytes, max {max} bytes)", .path.display())]
    ManifestTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("manifest {} is malformed: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Every configuration error of a run, sorted by message and numbered.
#[derive(Debug)]
pub struct AggregateConfigError {
    errors: Vec<ConfigurationError>,
}

impl AggregateConfigError {
    pub fn new(mut errors: Vec<ConfigurationError>) -> Self {
        errors.sort_by_cached_key(|e| e.to_string());
        Self { errors }
    }

    pub fn errors(&self) -> &[ConfigurationError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AggregateConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Work unit configuration errors:")?;
        writeln!(f)?;
        for (index, error) in self.errors.iter().enumerate() {
            writeln!(f, "{}) {}", index + 1, error)?;
            writeln!(f)?;
        }
        write!(f, "{} error(s)", self.errors.len())
    }
}

impl std::error::Error for AggregateConfigError {}

// ============================================================================
// Stage failures
// ============================================================================

/// Failure of one external tool stage.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not launch `{program}`")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed. Is the tool jar on the classpath?\n{}", .lines.join("\n"))]
    ErrorMarker { tool: &'static str, lines: Vec<String> },

    #[error("{tool} did not finish within {}s", .timeout.as_secs())]
    Timeout { tool: &'static str, timeout: Duration },

    #[error("cannot build the {tool} classpath")]
    Classpath {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed: {source}")]
    Process {
        tool: &'static str,
        #[source]
        source: ProcessError,
    },
}

/// Failure while synthesizing or compiling the driver.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("cannot write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot scan test source {}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: java_syntax::ScanError,
    },

    #[error("unable to compile {}. See errors:\n{}", .file.display(), .diagnostics.join("\n"))]
    Compile { file: PathBuf, diagnostics: Vec<String> },

    #[error("compiler could not run: {source}")]
    Compiler {
        #[source]
        source: ProcessError,
    },
}

// ============================================================================
// Pipeline
// ============================================================================

/// Top-level error reported for a run or a single work unit.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error(transparent)]
    #[diagnostic(
        code(daikon_runner::configuration),
        help("fix the listed options; nothing was executed")
    )]
    Configuration(#[from] AggregateConfigError),

    #[error("work unit `{unit}`: cannot create output directory {}", .path.display())]
    #[diagnostic(code(daikon_runner::output_dir))]
    OutputDir {
        unit: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("work unit `{unit}`: cannot scan classes directory {}", .path.display())]
    #[diagnostic(code(daikon_runner::catalog))]
    Catalog {
        unit: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("work unit `{unit}`: {reason}")]
    #[diagnostic(
        code(daikon_runner::driver_resolution),
        help("add a class named like `*.TestDriver` or configure a driver package to generate one")
    )]
    DriverResolution { unit: String, reason: String },

    #[error("work unit `{unit}`: unable to generate or compile the test driver: {source}")]
    #[diagnostic(code(daikon_runner::generation))]
    Generation {
        unit: String,
        #[source]
        source: GenerationError,
    },

    #[error("work unit `{unit}`: {stage} stage failed: {source}")]
    #[diagnostic(code(daikon_runner::tool_execution))]
    ToolExecution {
        unit: String,
        stage: Stage,
        #[source]
        source: ToolError,
    },
}
