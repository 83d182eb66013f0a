//! Tool invocation builder
//!
//! The three analysis stages share one option vocabulary (target class,
//! selection and omission patterns, output locations) but each renders it into
//! its own argument grammar and classpath format:
//!
//! | Stage          | Main class       | Classpath      | Working dir | Tool-specific flags                      |
//! |----------------|------------------|----------------|-------------|------------------------------------------|
//! | Comparability  | `daikon.DynComp` | path list      | classes dir | select, omit, `--output_dir=`            |
//! | Tracing        | `daikon.Chicory` | `file:` URLs   | output dir  | select, omit, `--comparability-file=`    |
//! | Inference      | `daikon.Daikon`  | path list      | classes dir | `<trace file> -o <invariant file>`       |
//!
//! Argument vectors are produced by the pure [`ToolInvocation::assemble`]; only
//! [`ToolInvocation::execute`] touches a [`ProcessRunner`].

pub mod artifacts;

pub use artifacts::ArtifactNames;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::classpath::ClasspathSet;
use crate::config::ToolchainConfig;
use crate::errors::ToolError;
use crate::process::{Command, ProcessError, ProcessOutput, ProcessRunner};

// ============================================================================
// Tool variants
// ============================================================================

/// One of the three external analysis tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Comparability analysis (DynComp)
    Comparability,
    /// Traced execution (Chicory)
    Tracing,
    /// Invariant inference (Daikon)
    Inference,
}

/// How a tool expects its `-classpath` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClasspathStyle {
    /// Entries joined by the path separator
    Paths,
    /// `file:` URLs joined by the path separator
    Urls,
}

impl ToolKind {
    /// Pipeline order.
    pub const ALL: [ToolKind; 3] = [ToolKind::Comparability, ToolKind::Tracing, ToolKind::Inference];

    pub fn display_name(self) -> &'static str {
        match self {
            ToolKind::Comparability => "DynComp",
            ToolKind::Tracing => "Chicory",
            ToolKind::Inference => "Daikon",
        }
    }

    pub fn main_class(self, config: &ToolchainConfig) -> &str {
        match self {
            ToolKind::Comparability => &config.comparability_main_class,
            ToolKind::Tracing => &config.tracing_main_class,
            ToolKind::Inference => &config.inference_main_class,
        }
    }

    pub fn classpath_style(self) -> ClasspathStyle {
        match self {
            ToolKind::Tracing => ClasspathStyle::Urls,
            ToolKind::Comparability | ToolKind::Inference => ClasspathStyle::Paths,
        }
    }

    /// Output-line prefixes that mean the tool failed.
    pub fn error_markers(self, config: &ToolchainConfig) -> Vec<&str> {
        let mut markers = vec![config.error_marker.as_str()];
        if self == ToolKind::Inference {
            markers.push(config.serialization_error_marker.as_str());
        }
        markers
    }

    pub fn timeout(self, config: &ToolchainConfig) -> Option<Duration> {
        match self {
            ToolKind::Comparability => config.timeouts.comparability(),
            ToolKind::Tracing => config.timeouts.tracing(),
            ToolKind::Inference => config.timeouts.inference(),
        }
    }

    /// Tool-specific arguments following the tool main class.
    fn tool_args(self, options: &ToolOptions) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(main_class) = options.main_class.as_deref().filter(|m| !m.is_empty()) {
            args.push(main_class.to_string());
        }

        match self {
            ToolKind::Comparability | ToolKind::Tracing => {
                args.extend(options.select_patterns.iter().map(|p| format!("--ppt-select-pattern={p}")));
                args.extend(options.omit_patterns.iter().map(|p| format!("--ppt-omit-pattern={p}")));
            }
            ToolKind::Inference => {}
        }

        match self {
            ToolKind::Comparability => {
                if let Some(dir) = &options.output_dir {
                    args.push(format!("--output_dir={}", dir.display()));
                }
            }
            ToolKind::Tracing => {
                if let Some(file) = &options.comparability_file {
                    args.push(format!("--comparability-file={}", file.display()));
                }
            }
            ToolKind::Inference => {
                if let Some(file) = &options.trace_file {
                    args.push(file.display().to_string());
                }
                if let Some(file) = &options.invariant_file {
                    args.push("-o".to_string());
                    args.push(file.display().to_string());
                }
            }
        }

        args.extend(options.extra_args.iter().cloned());
        args
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl ClasspathStyle {
    pub fn render(self, classpath: &ClasspathSet) -> std::io::Result<String> {
        match self {
            ClasspathStyle::Paths => Ok(classpath.join_paths()),
            ClasspathStyle::Urls => classpath.join_urls(),
        }
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Semantic options shared by all tools. Each tool renders only the ones it understands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOptions {
    /// Class whose execution is analysed
    pub main_class: Option<String>,
    pub select_patterns: Vec<String>,
    pub omit_patterns: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub comparability_file: Option<PathBuf>,
    pub trace_file: Option<PathBuf>,
    pub invariant_file: Option<PathBuf>,
    /// Appended after every tool-specific argument
    pub extra_args: Vec<String>,
}

/// Everything needed to run one tool once.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub kind: ToolKind,
    pub classpath: ClasspathSet,
    pub working_dir: PathBuf,
    pub options: ToolOptions,
}

impl ToolInvocation {
    pub fn new(kind: ToolKind, classpath: ClasspathSet, working_dir: impl Into<PathBuf>, options: ToolOptions) -> Self {
        Self {
            kind,
            classpath,
            working_dir: working_dir.into(),
            options,
        }
    }

    /// Full argument vector (launcher excluded):
    /// `<heap> -classpath <cp> <tool main class> <tool args> <user args>`.
    pub fn assemble(&self, config: &ToolchainConfig) -> Result<Vec<String>, ToolError> {
        let classpath = self
            .kind
            .classpath_style()
            .render(&self.classpath)
            .map_err(|source| ToolError::Classpath {
                tool: self.kind.display_name(),
                source,
            })?;

        let mut argv = vec![
            config.max_heap.clone(),
            "-classpath".to_string(),
            classpath,
            self.kind.main_class(config).to_string(),
        ];
        argv.extend(self.kind.tool_args(&self.options));
        Ok(argv)
    }

    pub fn command(&self, config: &ToolchainConfig) -> Result<Command, ToolError> {
        Ok(Command::new(&config.launcher)
            .args(self.assemble(config)?)
            .current_dir(&self.working_dir)
            .permit_non_zero_exit(true)
            .timeout(self.kind.timeout(config)))
    }

    /// Run the tool and classify its output.
    ///
    /// Success is decided by the absence of marker lines, whatever the exit code.
    pub fn execute(&self, runner: &dyn ProcessRunner, config: &ToolchainConfig) -> Result<ProcessOutput, ToolError> {
        let tool = self.kind.display_name();
        let command = self.command(config)?;
        tracing::debug!(tool, argv = %command, "invoking tool");

        let output = runner.run(&command).map_err(|source| match source {
            ProcessError::Spawn { program, source } => ToolError::Launch { program, source },
            ProcessError::Timeout { timeout, .. } => ToolError::Timeout { tool, timeout },
            source => ToolError::Process { tool, source },
        })?;
        tracing::debug!(tool, lines = output.lines.len(), exit_code = ?output.exit_code, "tool finished");

        let matched = output.lines_starting_with(&self.kind.error_markers(config));
        if !matched.is_empty() {
            return Err(ToolError::ErrorMarker { tool, lines: matched });
        }
        Ok(output)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::classpath::PATH_SEPARATOR;
    use crate::test_support::RecordingRunner;

    fn classpath() -> ClasspathSet {
        ["/w/build/classes/java/test", "/w/libs/daikon.jar"].into_iter().collect()
    }

    fn options() -> ToolOptions {
        ToolOptions {
            main_class: Some("com.foo.driver.TestDriver".into()),
            select_patterns: vec!["com.foo.ATest".into(), "com.foo.BTest".into()],
            ..ToolOptions::default()
        }
    }

    #[test]
    fn test_comparability_arguments() {
        let mut opts = options();
        opts.output_dir = Some(PathBuf::from("/w/out"));
        opts.omit_patterns = vec!["^org\\.junit".into()];
        opts.extra_args = vec!["--verbose".into()];
        let invocation = ToolInvocation::new(ToolKind::Comparability, classpath(), "/w/build/classes/java/test", opts);

        let argv = invocation.assemble(&ToolchainConfig::default()).unwrap();
        assert_eq!(
            argv,
            vec![
                "-Xmx4G".to_string(),
                "-classpath".into(),
                format!("/w/build/classes/java/test{PATH_SEPARATOR}/w/libs/daikon.jar"),
                "daikon.DynComp".into(),
                "com.foo.driver.TestDriver".into(),
                "--ppt-select-pattern=com.foo.ATest".into(),
                "--ppt-select-pattern=com.foo.BTest".into(),
                "--ppt-omit-pattern=^org\\.junit".into(),
                "--output_dir=/w/out".into(),
                "--verbose".into(),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_tracing_uses_url_classpath() {
        let mut opts = options();
        opts.comparability_file = Some(PathBuf::from("/w/out/TestDriver.decls-DynComp"));
        let invocation = ToolInvocation::new(ToolKind::Tracing, classpath(), "/w/out", opts);

        let argv = invocation.assemble(&ToolchainConfig::default()).unwrap();
        assert_eq!(argv[2], "file:///w/build/classes/java/test:file:///w/libs/daikon.jar");
        assert_eq!(argv[3], "daikon.Chicory");
        assert_eq!(argv.last().unwrap(), "--comparability-file=/w/out/TestDriver.decls-DynComp");
    }

    #[test]
    fn test_inference_arguments() {
        let opts = ToolOptions {
            main_class: Some("com.foo.driver.TestDriver".into()),
            trace_file: Some(PathBuf::from("/w/out/TestDriver.dtrace.gz")),
            invariant_file: Some(PathBuf::from("/w/out/TestDriver.inv.gz")),
            // Selection does not apply to inference.
            select_patterns: vec!["com.foo.ATest".into()],
            ..ToolOptions::default()
        };
        let invocation = ToolInvocation::new(ToolKind::Inference, classpath(), "/w", opts);
        let argv = invocation.assemble(&ToolchainConfig::default()).unwrap();
        assert_eq!(
            &argv[3..],
            &[
                "daikon.Daikon",
                "com.foo.driver.TestDriver",
                "/w/out/TestDriver.dtrace.gz",
                "-o",
                "/w/out/TestDriver.inv.gz"
            ]
        );
    }

    #[test]
    fn test_empty_main_class_is_omitted() {
        let opts = ToolOptions {
            main_class: Some(String::new()),
            ..ToolOptions::default()
        };
        let invocation = ToolInvocation::new(ToolKind::Comparability, classpath(), "/w", opts);
        let argv = invocation.assemble(&ToolchainConfig::default()).unwrap();
        assert_eq!(argv.len(), 4);
    }

    #[test]
    fn test_command_uses_launcher_and_working_dir() {
        let config = ToolchainConfig::default().with_launcher("/opt/jdk/bin/java");
        let invocation = ToolInvocation::new(ToolKind::Inference, classpath(), "/w/classes", ToolOptions::default());
        let command = invocation.command(&config).unwrap();
        assert_eq!(command.program, "/opt/jdk/bin/java");
        assert_eq!(command.working_dir.as_deref(), Some(std::path::Path::new("/w/classes")));
        assert!(command.permit_non_zero_exit);
    }

    #[test]
    fn test_error_marker_fails_with_matched_lines() {
        let runner = RecordingRunner::new().respond(
            &["some noise", "Error: Could not find or load main MyDriver", "more noise"],
            Some(1),
        );
        let invocation = ToolInvocation::new(ToolKind::Comparability, classpath(), "/w", options());
        let err = invocation.execute(&runner, &ToolchainConfig::default()).unwrap_err();
        match &err {
            ToolError::ErrorMarker { tool, lines } => {
                assert_eq!(*tool, "DynComp");
                assert_eq!(lines, &vec!["Error: Could not find or load main MyDriver".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("Error: Could not find or load main MyDriver"));
    }

    #[test]
    fn test_serialization_marker_only_for_inference() {
        let line = "Error: Unable to serialize invariants";
        let config = ToolchainConfig::default();

        let runner = RecordingRunner::new().respond(&[line], Some(0));
        let comparability = ToolInvocation::new(ToolKind::Comparability, classpath(), "/w", options());
        assert!(comparability.execute(&runner, &config).is_ok());

        let runner = RecordingRunner::new().respond(&[line], Some(0));
        let inference = ToolInvocation::new(ToolKind::Inference, classpath(), "/w", options());
        assert!(matches!(
            inference.execute(&runner, &config),
            Err(ToolError::ErrorMarker { tool: "Daikon", .. })
        ));
    }

    #[test]
    fn test_non_zero_exit_without_marker_succeeds() {
        let runner = RecordingRunner::new().respond(&["warning: recoverable"], Some(2));
        let invocation = ToolInvocation::new(ToolKind::Tracing, classpath(), "/w", options());
        let output = invocation.execute(&runner, &ToolchainConfig::default()).unwrap();
        assert_eq!(output.exit_code, Some(2));
    }

    #[test]
    fn test_launch_failure_maps_to_launch_error() {
        let runner = RecordingRunner::new().fail_spawn();
        let invocation = ToolInvocation::new(ToolKind::Comparability, classpath(), "/w", options());
        let err = invocation.execute(&runner, &ToolchainConfig::default()).unwrap_err();
        assert!(matches!(err, ToolError::Launch { .. }));
    }
}
