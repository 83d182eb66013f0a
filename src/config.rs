//! Toolchain configuration and work-unit manifests
//!
//! `ToolchainConfig` holds every fixed string the pipeline relies on (tool main
//! classes, output markers, directory conventions). It is built once and
//! passed by reference to each component.
//!
//! A manifest is a TOML file with an optional `[toolchain]` table and one or
//! more `[[unit]]` tables:
//!
//! ```toml
//! [toolchain]
//! launcher = "/usr/lib/jvm/java-17/bin/java"
//!
//! [toolchain.timeouts]
//! tracing = 900
//!
//! [[unit]]
//! name = "core"
//! classes_dir = "build/classes/java/test"
//! classpath = ["libs/daikon.jar", "build/classes/java/main"]
//! output_dir = "build/daikon"
//! driver_package = "com.foo.driver"
//! test_sources = "src/test/java"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classpath::{self, ClasspathSet};
use crate::errors::ConfigurationError;

/// Maximum manifest size (512 KiB).
const MAX_MANIFEST_SIZE: u64 = 512 * 1024;

/// Java identifier, with `$` allowed as the JVM does.
const JAVA_IDENT: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";

// ============================================================================
// Toolchain
// ============================================================================

/// How the generated test driver exercises the test classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverStrategy {
    /// Framework delegation when the discovery launcher is on the classpath, direct calls otherwise
    #[default]
    Auto,
    /// Instantiate each test class and call its annotated methods
    Direct,
    /// Hand the test classes to the test framework's runner
    Framework,
}

/// Optional per-stage timeouts, in seconds. `None` waits forever.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageTimeouts {
    pub comparability: Option<u64>,
    pub tracing: Option<u64>,
    pub inference: Option<u64>,
    pub compile: Option<u64>,
}

impl StageTimeouts {
    /// Same timeout for every stage.
    pub fn uniform(secs: u64) -> Self {
        Self {
            comparability: Some(secs),
            tracing: Some(secs),
            inference: Some(secs),
            compile: Some(secs),
        }
    }

    pub fn comparability(&self) -> Option<Duration> {
        self.comparability.map(Duration::from_secs)
    }

    pub fn tracing(&self) -> Option<Duration> {
        self.tracing.map(Duration::from_secs)
    }

    pub fn inference(&self) -> Option<Duration> {
        self.inference.map(Duration::from_secs)
    }

    pub fn compile(&self) -> Option<Duration> {
        self.compile.map(Duration::from_secs)
    }
}

/// Fixed names, markers and conventions shared by all pipeline components.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// JVM launcher used for all three tools
    pub launcher: String,
    /// Heap flag passed to every tool JVM
    pub max_heap: String,
    /// Java compiler used for the generated driver
    pub compiler: String,
    pub comparability_main_class: String,
    pub tracing_main_class: String,
    pub inference_main_class: String,
    /// Simple name of the driver class (and the artifact prefix when generated)
    pub driver_class_name: String,
    /// Shape every candidate driver name must match
    pub driver_name_pattern: String,
    /// Path segment after which class files are laid out by package
    pub class_root_marker: String,
    /// Class files whose name contains this are synthetic and skipped
    pub synthetic_marker: String,
    /// Output prefix meaning a tool's main class could not be loaded
    pub error_marker: String,
    /// Output prefix meaning the inference tool could not write its result
    pub serialization_error_marker: String,
    /// Classpath substring identifying the discovery-based test launcher
    pub junit5_launcher_marker: String,
    /// Annotation (simple name) marking a test method
    pub test_annotation: String,
    /// Jar whose presence on the classpath means the tools are installed
    pub tool_jar_name: String,
    pub driver_strategy: DriverStrategy,
    pub timeouts: StageTimeouts,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            launcher: "java".to_string(),
            max_heap: "-Xmx4G".to_string(),
            compiler: "javac".to_string(),
            comparability_main_class: "daikon.DynComp".to_string(),
            tracing_main_class: "daikon.Chicory".to_string(),
            inference_main_class: "daikon.Daikon".to_string(),
            driver_class_name: "TestDriver".to_string(),
            driver_name_pattern: format!(r"^(?:{JAVA_IDENT}\.)*{JAVA_IDENT}$"),
            class_root_marker: "classes/java/test".to_string(),
            synthetic_marker: "$".to_string(),
            error_marker: "Error: Could not find or load main".to_string(),
            serialization_error_marker: "Error: Unable to serialize".to_string(),
            junit5_launcher_marker: "org.junit.platform.launcher".to_string(),
            test_annotation: "Test".to_string(),
            tool_jar_name: "daikon.jar".to_string(),
            driver_strategy: DriverStrategy::Auto,
            timeouts: StageTimeouts::default(),
        }
    }
}

impl ToolchainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JVM launcher
    pub fn with_launcher(mut self, launcher: impl Into<String>) -> Self {
        self.launcher = launcher.into();
        self
    }

    /// Set the Java compiler
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_driver_strategy(mut self, strategy: DriverStrategy) -> Self {
        self.driver_strategy = strategy;
        self
    }

    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Compiled driver-name shape check.
    pub fn driver_name_regex(&self) -> Result<Regex, ConfigurationError> {
        Regex::new(&self.driver_name_pattern).map_err(|source| ConfigurationError::InvalidDriverNamePattern {
            pattern: self.driver_name_pattern.clone(),
            source,
        })
    }

    /// Validate the toolchain itself (everything a unit does not own).
    pub fn validate(&self) -> Vec<ConfigurationError> {
        let mut errors = Vec::new();
        if let Err(e) = self.driver_name_regex() {
            errors.push(e);
        }
        if !is_java_identifier(&self.driver_class_name) {
            errors.push(ConfigurationError::InvalidDriverClassName {
                name: self.driver_class_name.clone(),
            });
        }
        errors
    }
}

/// Whether `name` is a single Java identifier.
pub fn is_java_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Whether `name` is a dotted Java package name.
pub fn is_java_package(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_java_identifier)
}

// ============================================================================
// Work units
// ============================================================================

/// One unit as written by the user; every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkUnitSpec {
    pub name: Option<String>,
    pub classes_dir: Option<PathBuf>,
    pub classpath: Option<Vec<PathBuf>>,
    /// Classpath used to compile the generated driver (defaults to `classpath`)
    pub runtime_classpath: Option<Vec<PathBuf>>,
    pub output_dir: Option<PathBuf>,
    pub driver_package: Option<String>,
    /// Root of the test sources, laid out by package
    pub test_sources: Option<PathBuf>,
    /// Directory whose jars are appended to the classpath
    pub requires: Option<PathBuf>,
    pub omit_patterns: Vec<String>,
    pub extra_args: Vec<String>,
}

/// A validated, self-contained unit of work.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub name: String,
    pub classes_dir: PathBuf,
    /// Classpath handed to the three tools
    pub classpath: ClasspathSet,
    /// Classpath used to compile the generated driver
    pub runtime_classpath: ClasspathSet,
    pub output_dir: PathBuf,
    pub driver_package: Option<String>,
    pub test_sources: Option<PathBuf>,
    pub omit_patterns: Vec<String>,
    pub extra_args: Vec<String>,
}

impl WorkUnit {
    /// Directory the generated driver source is written into.
    pub fn driver_source_dir(&self, package: &str) -> PathBuf {
        let mut dir = self.output_dir.join("driver");
        for segment in package.split('.') {
            dir.push(segment);
        }
        dir
    }
}

impl WorkUnitSpec {
    /// Resolve relative paths against `base` (the manifest's directory).
    pub fn resolve_relative(mut self, base: &Path) -> Self {
        let fix = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.classes_dir = self.classes_dir.map(fix);
        self.output_dir = self.output_dir.map(fix);
        self.test_sources = self.test_sources.map(fix);
        self.requires = self.requires.map(fix);
        self.classpath = self.classpath.map(|cp| cp.into_iter().map(fix).collect());
        self.runtime_classpath = self.runtime_classpath.map(|cp| cp.into_iter().map(fix).collect());
        self
    }

    /// Validate into a `WorkUnit`, collecting every problem rather than the first.
    ///
    /// `index` names anonymous units (`unit-1`, `unit-2`, ...).
    pub fn validate(self, index: usize) -> Result<WorkUnit, Vec<ConfigurationError>> {
        let unit = self.name.clone().unwrap_or_else(|| format!("unit-{}", index + 1));
        let mut errors = Vec::new();

        let classpath_entries = match self.classpath {
            Some(cp) if !cp.is_empty() => cp,
            _ => {
                errors.push(ConfigurationError::MissingClasspath { unit: unit.clone() });
                Vec::new()
            }
        };

        match &self.classes_dir {
            None => errors.push(ConfigurationError::MissingClassesDir { unit: unit.clone() }),
            Some(dir) if !dir.is_dir() => errors.push(ConfigurationError::ClassesDirNotFound {
                unit: unit.clone(),
                path: dir.clone(),
            }),
            Some(_) => {}
        }

        if self.output_dir.is_none() {
            errors.push(ConfigurationError::MissingOutputDir { unit: unit.clone() });
        }

        // An empty package means "not configured".
        let driver_package = self.driver_package.filter(|p| !p.trim().is_empty());
        if let Some(package) = &driver_package {
            if !is_java_package(package) {
                errors.push(ConfigurationError::InvalidDriverPackage {
                    unit: unit.clone(),
                    package: package.clone(),
                });
            }
        }

        for pattern in &self.omit_patterns {
            if let Err(source) = Regex::new(pattern) {
                errors.push(ConfigurationError::InvalidOmitPattern {
                    unit: unit.clone(),
                    pattern: pattern.clone(),
                    source,
                });
            }
        }

        let required_jars = match &self.requires {
            Some(dir) => match classpath::jars_in(dir) {
                Ok(jars) => jars,
                Err(source) => {
                    errors.push(ConfigurationError::RequiresUnreadable {
                        unit: unit.clone(),
                        path: dir.clone(),
                        source,
                    });
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let (Some(classes_dir), Some(output_dir), true) = (self.classes_dir, self.output_dir, errors.is_empty())
        else {
            return Err(errors);
        };

        // The classes directory always comes first so the driver and the tests resolve.
        let mut classpath = ClasspathSet::new();
        classpath.insert(classes_dir.clone());
        classpath.extend(classpath_entries.iter().cloned());
        classpath.extend(required_jars.iter().cloned());

        let mut runtime_classpath = ClasspathSet::new();
        runtime_classpath.insert(classes_dir.clone());
        match self.runtime_classpath {
            Some(entries) => runtime_classpath.extend(entries),
            None => runtime_classpath.extend(classpath_entries),
        }
        runtime_classpath.extend(required_jars);

        Ok(WorkUnit {
            name: unit,
            classes_dir,
            classpath,
            runtime_classpath,
            output_dir,
            driver_package,
            test_sources: self.test_sources,
            omit_patterns: self.omit_patterns,
            extra_args: self.extra_args,
        })
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Parsed manifest file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default, rename = "unit")]
    pub units: Vec<WorkUnitSpec>,
}

impl Manifest {
    /// Load a manifest from disk; relative unit paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let metadata = fs::metadata(path).map_err(|source| ConfigurationError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        if metadata.len() > MAX_MANIFEST_SIZE {
            return Err(ConfigurationError::ManifestTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                max: MAX_MANIFEST_SIZE,
            });
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or(Path::new("."));
        Self::parse(&content, path, base)
    }

    /// Parse manifest text. `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path, base: &Path) -> Result<Self, ConfigurationError> {
        let mut manifest: Manifest = toml::from_str(content).map_err(|source| ConfigurationError::ManifestParse {
            path: origin.to_path_buf(),
            source,
        })?;
        manifest.units = manifest
            .units
            .into_iter()
            .map(|unit| unit.resolve_relative(base))
            .collect();
        Ok(manifest)
    }
}
