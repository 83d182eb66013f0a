//! Stage artifact naming.
//!
//! Stages hand data to each other only through files in the output directory,
//! named after the driver's simple class name.

use std::path::{Path, PathBuf};

use serde::Serialize;

pub const COMPARABILITY_SUFFIX: &str = ".decls-DynComp";
pub const TRACE_SUFFIX: &str = ".dtrace.gz";
pub const INVARIANT_SUFFIX: &str = ".inv.gz";

/// Output files of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactNames {
    pub prefix: String,
    pub comparability_file: PathBuf,
    pub trace_file: PathBuf,
    pub invariant_file: PathBuf,
}

impl ArtifactNames {
    /// Names for `main_class` (qualified or simple) inside `output_dir`.
    pub fn new(output_dir: &Path, main_class: &str) -> Self {
        let prefix = simple_name(main_class).to_string();
        Self {
            comparability_file: output_dir.join(format!("{prefix}{COMPARABILITY_SUFFIX}")),
            trace_file: output_dir.join(format!("{prefix}{TRACE_SUFFIX}")),
            invariant_file: output_dir.join(format!("{prefix}{INVARIANT_SUFFIX}")),
            prefix,
        }
    }
}

/// Last dotted segment of a qualified class name.
pub fn simple_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}
