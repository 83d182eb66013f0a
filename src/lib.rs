#![forbid(unsafe_code)]
//! Daikon toolchain runner
//!
//! Drives the three Daikon stages (DynComp comparability analysis, Chicory
//! traced execution, Daikon invariant inference) over a directory of compiled
//! test classes, generating a test driver when the project has none.
//!
//! ## Layout
//!
//! - `process` - external command execution behind the `ProcessRunner` trait
//! - `tools` - per-tool argument assembly and output classification
//! - `catalog` - class discovery under a compiled classes directory
//! - `driver` - test driver synthesis and compilation
//! - `pipeline` - per-unit state machine, error aggregation, run reports
//! - `config` - toolchain defaults and TOML work-unit manifests
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `pipeline`
//!   modules enforce `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod catalog;
pub mod classpath;
pub mod cli;
pub mod config;
pub mod driver;
pub mod errors;
pub mod pipeline;
pub mod process;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::ClassCatalog;
pub use classpath::ClasspathSet;
pub use config::{DriverStrategy, Manifest, ToolchainConfig, WorkUnit, WorkUnitSpec};
pub use errors::{AggregateConfigError, ConfigurationError, GenerationError, PipelineError, ToolError};
pub use pipeline::{Pipeline, RunReport, Stage, UnitExecutor};
pub use process::{ProcessRunner, SystemProcessRunner};
