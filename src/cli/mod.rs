//! CLI module for daikon-runner
//!
//! ## Commands
//!
//! - `run` - Validate every work unit, then run the three-stage toolchain on each
//! - `check` - Verify the tool jar is on a classpath
//! - `generate` - Generate (and compile) the test driver only
//! - `catalog` - Print the classes discovered under a classes directory
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::classpath::PATH_SEPARATOR;
use crate::config::{DriverStrategy, StageTimeouts, ToolchainConfig, WorkUnitSpec};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a diagnostic error the way miette does.
    pub fn diagnostic(error: impl miette::Diagnostic + Send + Sync + 'static) -> Self {
        Self::failure(format!("{:?}", miette::Report::new(error)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Drive DynComp, Chicory and Daikon over compiled test classes
#[derive(Parser, Debug)]
#[command(name = "daikon-runner")]
#[command(version = VERSION)]
#[command(about = "Run the Daikon toolchain over compiled test classes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run comparability analysis, traced execution and invariant inference
    Run {
        /// TOML manifest describing one or more work units
        #[arg(short, long, value_name = "FILE")]
        manifest: Option<PathBuf>,
        #[command(flatten)]
        unit: UnitArgs,
        #[command(flatten)]
        toolchain: ToolchainArgs,
    },

    /// Check that the tool jar is on a classpath
    Check {
        /// Classpath entries (repeat or separate with the platform path separator)
        #[arg(long = "classpath", visible_alias = "cp", value_name = "PATHS", value_delimiter = PATH_SEPARATOR, required = true)]
        classpath: Vec<PathBuf>,
        /// Directory whose jars are added to the classpath
        #[arg(long, value_name = "DIR")]
        requires: Option<PathBuf>,
    },

    /// Generate and compile the test driver without running the tools
    Generate {
        #[arg(short, long, value_name = "FILE")]
        manifest: Option<PathBuf>,
        #[command(flatten)]
        unit: UnitArgs,
        #[command(flatten)]
        toolchain: ToolchainArgs,
        /// Print the driver source instead of writing and compiling it
        #[arg(long)]
        print: bool,
    },

    /// List the classes found under a classes directory
    Catalog {
        #[arg(long, value_name = "DIR")]
        classes_dir: PathBuf,
        /// Path segment after which class files are laid out by package
        #[arg(long, value_name = "SEGMENTS")]
        marker: Option<String>,
    },
}

/// A single work unit given on the command line.
#[derive(Args, Debug, Default, Clone)]
pub struct UnitArgs {
    /// Work unit name used in messages and reports
    #[arg(long)]
    pub name: Option<String>,
    /// Directory of compiled test classes
    #[arg(long, value_name = "DIR")]
    pub classes_dir: Option<PathBuf>,
    /// Tool classpath (repeat or separate with the platform path separator)
    #[arg(long = "classpath", visible_alias = "cp", value_name = "PATHS", value_delimiter = PATH_SEPARATOR)]
    pub classpath: Vec<PathBuf>,
    /// Classpath used to compile the generated driver (defaults to --classpath)
    #[arg(long, value_name = "PATHS", value_delimiter = PATH_SEPARATOR)]
    pub runtime_classpath: Vec<PathBuf>,
    /// Directory receiving the tool outputs
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Generate the driver in this package
    #[arg(long, value_name = "PACKAGE")]
    pub driver_package: Option<String>,
    /// Root of the test sources, laid out by package
    #[arg(long, value_name = "DIR")]
    pub test_sources: Option<PathBuf>,
    /// Directory whose jars are appended to the classpath
    #[arg(long, value_name = "DIR")]
    pub requires: Option<PathBuf>,
    /// Fully-qualified-name regex excluded from analysis (repeatable)
    #[arg(long = "omit-pattern", value_name = "REGEX")]
    pub omit_patterns: Vec<String>,
    /// Extra arguments passed to every tool
    #[arg(last = true, value_name = "TOOL_ARGS")]
    pub extra_args: Vec<String>,
}

impl UnitArgs {
    /// Whether any unit flag was given.
    pub fn is_set(&self) -> bool {
        self.name.is_some()
            || self.classes_dir.is_some()
            || !self.classpath.is_empty()
            || !self.runtime_classpath.is_empty()
            || self.output_dir.is_some()
            || self.driver_package.is_some()
            || self.test_sources.is_some()
            || self.requires.is_some()
            || !self.omit_patterns.is_empty()
            || !self.extra_args.is_empty()
    }

    pub fn into_spec(self) -> WorkUnitSpec {
        WorkUnitSpec {
            name: self.name,
            classes_dir: self.classes_dir,
            classpath: Some(self.classpath).filter(|cp| !cp.is_empty()),
            runtime_classpath: Some(self.runtime_classpath).filter(|cp| !cp.is_empty()),
            output_dir: self.output_dir,
            driver_package: self.driver_package,
            test_sources: self.test_sources,
            requires: self.requires,
            omit_patterns: self.omit_patterns,
            extra_args: self.extra_args,
        }
    }
}

/// Toolchain overrides, applied on top of the manifest.
#[derive(Args, Debug, Default, Clone)]
pub struct ToolchainArgs {
    /// JVM launcher
    #[arg(long, value_name = "PATH")]
    pub java: Option<String>,
    /// Java compiler for the generated driver
    #[arg(long, value_name = "PATH")]
    pub javac: Option<String>,
    /// Driver generation strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
    /// Per-stage timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Auto,
    Direct,
    Framework,
}

impl From<StrategyArg> for DriverStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => DriverStrategy::Auto,
            StrategyArg::Direct => DriverStrategy::Direct,
            StrategyArg::Framework => DriverStrategy::Framework,
        }
    }
}

impl ToolchainArgs {
    pub fn apply(self, mut config: ToolchainConfig) -> ToolchainConfig {
        if let Some(java) = self.java {
            config = config.with_launcher(java);
        }
        if let Some(javac) = self.javac {
            config = config.with_compiler(javac);
        }
        if let Some(strategy) = self.strategy {
            config = config.with_driver_strategy(strategy.into());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeouts(StageTimeouts::uniform(secs));
        }
        config
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run {
            manifest,
            unit,
            toolchain,
        } => commands::run_units(manifest.as_deref(), unit, toolchain),
        Command::Check { classpath, requires } => commands::check_installation(&classpath, requires.as_deref()),
        Command::Generate {
            manifest,
            unit,
            toolchain,
            print,
        } => commands::generate_drivers(manifest.as_deref(), unit, toolchain, print),
        Command::Catalog { classes_dir, marker } => commands::list_catalog(&classes_dir, marker.as_deref()),
    }
}

// ============================================================================
// Tests
// ============================================================================
