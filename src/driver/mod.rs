//! Test driver generation
//!
//! When a work unit has no class matching the driver naming convention, or a
//! driver package is configured, a driver is synthesized:
//!
//! 1. [`DriverSpec::build`] pairs each known test class with the test methods
//!    found in its source file (through a [`TestMethodScanner`]).
//! 2. [`select_kind`] picks direct invocation or framework delegation.
//! 3. [`DriverGenerator::generate`] writes `<DriverClass>.java` under the
//!    output directory and compiles it into the classes directory.
//!
//! ## Modules
//!
//! - `writer` - line-oriented emission with clamped indentation
//! - `emit` - per-strategy source templates
//! - `javac` - compiler wrapper

pub mod emit;
pub mod javac;
pub mod writer;

pub use emit::{DriverKind, render};
pub use javac::{CompileOutcome, Javac};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::classpath::ClasspathSet;
use crate::config::{DriverStrategy, ToolchainConfig, WorkUnit};
use crate::errors::GenerationError;
use crate::process::ProcessRunner;

// ============================================================================
// Spec
// ============================================================================

/// A test class and the test methods found in its source, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestClassSpec {
    /// Fully-qualified name
    pub name: String,
    /// Empty when no source was found or it declares no test methods
    pub methods: Vec<String>,
    /// Whether a source declaring the public class was found
    pub has_source: bool,
}

/// Input to the generator: target package and test classes in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSpec {
    pub package: String,
    pub classes: Vec<TestClassSpec>,
}

/// Finds test methods in one source file.
pub trait TestMethodScanner {
    /// Test method names in source order, or `None` if the file declares no public class.
    fn test_methods(&self, source: &Path) -> Result<Option<Vec<String>>, GenerationError>;
}

/// Scans sources with the lightweight Java tokenizer.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    annotation: String,
}

impl SourceScanner {
    pub fn new(annotation: impl Into<String>) -> Self {
        Self {
            annotation: annotation.into(),
        }
    }
}

impl TestMethodScanner for SourceScanner {
    fn test_methods(&self, source: &Path) -> Result<Option<Vec<String>>, GenerationError> {
        let text = fs::read_to_string(source).map_err(|e| GenerationError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        let class = java_syntax::parse_test_class(&text, &self.annotation).map_err(|e| GenerationError::Scan {
            path: source.to_path_buf(),
            source: e,
        })?;
        Ok(class.map(|c| c.methods))
    }
}

impl DriverSpec {
    /// Pair each of `test_classes` with its test methods.
    ///
    /// Sources are looked up as `<test_sources>/<package path>/<Simple>.java`;
    /// a class without a source keeps an empty method list and `has_source` unset.
    pub fn build(
        package: &str,
        test_classes: &[String],
        test_sources: Option<&Path>,
        scanner: &dyn TestMethodScanner,
    ) -> Result<Self, GenerationError> {
        let mut classes = Vec::with_capacity(test_classes.len());
        for name in test_classes {
            let source = test_sources.map(|root| source_path(root, name)).filter(|p| p.is_file());
            let scanned = match source {
                Some(path) => scanner.test_methods(&path)?,
                None => None,
            };
            let has_source = scanned.is_some();
            let methods = scanned.unwrap_or_default();
            tracing::trace!(class = %name, has_source, methods = methods.len(), "test class");
            classes.push(TestClassSpec {
                name: name.clone(),
                methods,
                has_source,
            });
        }
        Ok(Self {
            package: package.to_string(),
            classes,
        })
    }
}

/// `<root>/a/b/C.java` for `a.b.C`.
pub fn source_path(root: &Path, qualified: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    let segments: Vec<&str> = qualified.split('.').collect();
    if let Some((simple, packages)) = segments.split_last() {
        for segment in packages {
            path.push(segment);
        }
        path.push(format!("{simple}.java"));
    }
    path
}

/// Resolve the configured strategy against the runtime classpath.
pub fn select_kind(strategy: DriverStrategy, runtime_classpath: &ClasspathSet, launcher_marker: &str) -> DriverKind {
    let has_launcher = runtime_classpath.mentions(launcher_marker);
    match strategy {
        DriverStrategy::Direct => DriverKind::Direct,
        DriverStrategy::Auto if has_launcher => DriverKind::JUnit5,
        DriverStrategy::Auto => DriverKind::Direct,
        DriverStrategy::Framework if has_launcher => DriverKind::JUnit5,
        DriverStrategy::Framework => DriverKind::JUnit4,
    }
}

// ============================================================================
// Generation
// ============================================================================

/// A written and compiled driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub source_file: PathBuf,
    /// Where the compiled class was written
    pub classes_dir: PathBuf,
    /// Fully-qualified driver class name
    pub main_class: String,
    pub kind: DriverKind,
}

pub struct DriverGenerator<'a> {
    config: &'a ToolchainConfig,
    runner: &'a dyn ProcessRunner,
}

impl<'a> DriverGenerator<'a> {
    pub fn new(config: &'a ToolchainConfig, runner: &'a dyn ProcessRunner) -> Self {
        Self { config, runner }
    }

    pub fn kind_for(&self, unit: &WorkUnit) -> DriverKind {
        select_kind(
            self.config.driver_strategy,
            &unit.runtime_classpath,
            &self.config.junit5_launcher_marker,
        )
    }

    /// Source text only; nothing is written.
    pub fn render(&self, spec: &DriverSpec, kind: DriverKind) -> String {
        render(spec, kind, &self.config.driver_class_name)
    }

    /// Write the driver source, replacing any previous one, and compile it.
    #[tracing::instrument(skip_all, fields(unit = %unit.name, package = %spec.package))]
    pub fn generate(&self, spec: &DriverSpec, unit: &WorkUnit) -> Result<GeneratedArtifact, GenerationError> {
        let kind = self.kind_for(unit);
        let source = self.render(spec, kind);
        let source_file = write_source(&unit.driver_source_dir(&spec.package), &self.config.driver_class_name, &source)?;
        tracing::info!(file = %source_file.display(), ?kind, "driver source written");

        let outcome = Javac::new(self.config, &unit.runtime_classpath, &unit.classes_dir)
            .working_dir(&unit.output_dir)
            .compile(self.runner, &[source_file.as_path()])
            .map_err(|source| GenerationError::Compiler { source })?;
        if !outcome.success {
            return Err(GenerationError::Compile {
                file: source_file,
                diagnostics: outcome.diagnostics,
            });
        }

        Ok(GeneratedArtifact {
            source_file,
            classes_dir: unit.classes_dir.clone(),
            main_class: format!("{}.{}", spec.package, self.config.driver_class_name),
            kind,
        })
    }
}

fn write_source(dir: &Path, class_name: &str, source: &str) -> Result<PathBuf, GenerationError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| GenerationError::Io { path, source }
    };

    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let file = dir.join(format!("{class_name}.java"));
    if file.exists() {
        fs::remove_file(&file).map_err(io_error(&file))?;
    }
    fs::write(&file, source).map_err(io_error(&file))?;
    Ok(file)
}
