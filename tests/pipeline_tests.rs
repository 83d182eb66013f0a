//! End-to-end pipeline tests against stand-in `java` and `javac` executables
//!
//! The stand-ins are shell scripts that append their working directory and
//! arguments to a log file and create the artifact each Daikon stage would
//! produce, so the real process runner is exercised without a JVM.
//!
//! Run with: `cargo test --test pipeline_tests`

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use daikon_runner::config::StageTimeouts;
use daikon_runner::errors::{GenerationError, ToolError};
use daikon_runner::pipeline::report::REPORT_FILE_NAME;
use daikon_runner::{PipelineError, Pipeline, Stage, SystemProcessRunner, ToolchainConfig, UnitExecutor, WorkUnitSpec};

/// Stand-in launcher that behaves like a successful Daikon installation.
const FAKE_JAVA: &str = r#"#!/bin/sh
printf '%s|%s\n' "$(pwd)" "$*" >> "__LOG__"
tool=""
main=""
out=""
inv=""
prev=""
for arg in "$@"; do
  case "$prev" in
    daikon.DynComp|daikon.Chicory|daikon.Daikon) tool="$prev"; main="$arg" ;;
    -o) inv="$arg" ;;
  esac
  case "$arg" in
    --output_dir=*) out="${arg#--output_dir=}" ;;
  esac
  prev="$arg"
done
simple="${main##*.}"
case "$tool" in
  daikon.DynComp) : > "$out/$simple.decls-DynComp" ;;
  daikon.Chicory) : > "$(pwd)/$simple.dtrace.gz" ;;
  daikon.Daikon) : > "$inv" ;;
esac
exit 0
"#;

/// Stand-in launcher whose tool class cannot be loaded.
const BROKEN_JAVA: &str = r#"#!/bin/sh
printf '%s|%s\n' "$(pwd)" "$*" >> "__LOG__"
echo "Error: Could not find or load main class daikon.DynComp"
exit 1
"#;

/// Stand-in launcher that never finishes on its own.
const HANGING_JAVA: &str = r#"#!/bin/sh
printf '%s|%s\n' "$(pwd)" "$*" >> "__LOG__"
exec sleep 30
"#;

/// Stand-in compiler that succeeds silently.
const FAKE_JAVAC: &str = r#"#!/bin/sh
printf '%s|%s\n' "$(pwd)" "$*" >> "__LOG__"
exit 0
"#;

/// Stand-in compiler that reports a syntax error.
const FAILING_JAVAC: &str = r#"#!/bin/sh
printf '%s|%s\n' "$(pwd)" "$*" >> "__LOG__"
echo "TestDriver.java:3: error: ';' expected"
exit 1
"#;

struct Sandbox {
    _dir: tempfile::TempDir,
    root: PathBuf,
    log: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let log = root.join("calls.log");
        Self { _dir: dir, root, log }
    }

    fn script(&self, name: &str, body: &str) -> String {
        let path = self.root.join("bin").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body.replace("__LOG__", &self.log.to_string_lossy())).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn config(&self, java: &str, javac: &str) -> ToolchainConfig {
        ToolchainConfig::default()
            .with_launcher(self.script("java", java))
            .with_compiler(self.script("javac", javac))
    }

    /// Compiled `ATest`/`BTest` plus sources for the test-method scan.
    fn project(&self) -> WorkUnitSpec {
        let classes_dir = self.root.join("project/build/classes/java/test");
        let sources = self.root.join("project/src/test/java");
        fs::create_dir_all(classes_dir.join("com/foo")).unwrap();
        fs::create_dir_all(sources.join("com/foo")).unwrap();
        fs::write(classes_dir.join("com/foo/ATest.class"), b"").unwrap();
        fs::write(classes_dir.join("com/foo/BTest.class"), b"").unwrap();
        fs::write(classes_dir.join("com/foo/ATest$1.class"), b"").unwrap();
        fs::write(
            sources.join("com/foo/ATest.java"),
            "package com.foo;\n\npublic class ATest {\n  @Test\n  public void adds() {}\n\n  @Test\n  public void subtracts() {}\n}\n",
        )
        .unwrap();
        fs::write(
            sources.join("com/foo/BTest.java"),
            "package com.foo;\n\npublic class BTest {\n  @Test\n  public void parses() {}\n}\n",
        )
        .unwrap();
        fs::write(self.root.join("daikon.jar"), b"").unwrap();

        WorkUnitSpec {
            name: Some("core".into()),
            classes_dir: Some(classes_dir),
            classpath: Some(vec![self.root.join("daikon.jar")]),
            output_dir: Some(self.root.join("out")),
            driver_package: Some("com.foo.driver".into()),
            test_sources: Some(sources),
            ..WorkUnitSpec::default()
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        match fs::read_to_string(&self.log) {
            Ok(text) => text
                .lines()
                .map(|line| {
                    let (dir, args) = line.split_once('|').unwrap();
                    (dir.to_string(), args.to_string())
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn same_dir(a: &str, b: &Path) -> bool {
    fs::canonicalize(a).unwrap() == fs::canonicalize(b).unwrap()
}

#[test]
fn test_generated_driver_runs_through_all_stages() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(FAKE_JAVA, FAKE_JAVAC);
    let spec = sandbox.project();
    let classes_dir = spec.classes_dir.clone().unwrap();
    let output_dir = spec.output_dir.clone().unwrap();

    let mut executor = UnitExecutor::for_toolchain(&config);
    executor.install(spec);
    let runner = SystemProcessRunner;
    let pipeline = Pipeline::new(&config, &runner);
    let summary = executor.execute(&pipeline).unwrap();

    assert!(summary.all_succeeded(), "{:?}", summary.outcomes[0].result);
    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.report.main_class.as_deref(), Some("com.foo.driver.TestDriver"));

    let driver = output_dir.join("driver/com/foo/driver/TestDriver.java");
    let source = fs::read_to_string(&driver).unwrap();
    assert!(source.starts_with("package com.foo.driver;\n"));
    assert!(source.contains("testClass1.adds();"));
    assert!(source.contains("testClass1.subtracts();"));
    assert!(source.contains("testClass2.parses();"));

    let artifacts = outcome.result.as_ref().unwrap();
    assert!(artifacts.comparability_file.is_file());
    assert!(artifacts.trace_file.is_file());
    assert!(artifacts.invariant_file.is_file());
    assert!(artifacts.invariant_file.ends_with("out/TestDriver.inv.gz"));

    let calls = sandbox.calls();
    assert_eq!(calls.len(), 4);

    let (javac_dir, javac_args) = &calls[0];
    assert!(same_dir(javac_dir, &output_dir));
    assert!(javac_args.starts_with("-g -classpath "));
    assert!(javac_args.ends_with("TestDriver.java"));

    let tools = ["daikon.DynComp", "daikon.Chicory", "daikon.Daikon"];
    for ((dir, args), tool) in calls[1..].iter().zip(tools) {
        assert!(args.starts_with("-Xmx4G -classpath "), "{args}");
        assert!(args.contains(&format!(" {tool} com.foo.driver.TestDriver")), "{args}");
        let expected_dir = if tool == "daikon.Chicory" { &output_dir } else { &classes_dir };
        assert!(same_dir(dir, expected_dir), "{tool} ran in {dir}");
    }
    assert!(calls[1].1.contains("--ppt-select-pattern=com.foo.ATest"));
    assert!(calls[1].1.contains("--ppt-select-pattern=com.foo.BTest"));
    assert!(!calls[1].1.contains("ATest$1"));
    assert!(calls[2].1.contains("file:"));
    assert!(calls[2].1.contains("--comparability-file="));
    assert!(calls[3].1.contains(" -o "));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output_dir.join(REPORT_FILE_NAME)).unwrap()).unwrap();
    assert_eq!(report["last_stage"], "done");
    assert_eq!(report["driver_kind"], "direct");
    assert_eq!(report["stages"].as_array().unwrap().len(), 5);
}

#[test]
fn test_comparability_error_marker_aborts_the_unit() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(BROKEN_JAVA, FAKE_JAVAC);
    let spec = sandbox.project();
    let output_dir = spec.output_dir.clone().unwrap();

    let unit = spec.validate(0).unwrap();
    let runner = SystemProcessRunner;
    let outcome = Pipeline::new(&config, &runner).run_unit(&unit);

    match &outcome.result {
        Err(PipelineError::ToolExecution { stage, source, .. }) => {
            assert_eq!(*stage, Stage::Comparability);
            match source {
                ToolError::ErrorMarker { lines, .. } => {
                    assert_eq!(lines, &vec!["Error: Could not find or load main class daikon.DynComp".to_string()]);
                }
                other => panic!("unexpected tool error: {other:?}"),
            }
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // javac plus DynComp only; Chicory and Daikon never start.
    assert_eq!(sandbox.calls().len(), 2);
    assert!(!output_dir.join("TestDriver.dtrace.gz").exists());
    assert_eq!(outcome.report.last_stage, Stage::Aborted);
    assert_eq!(outcome.report.failed_stage, Some(Stage::Comparability));

    // The generated driver is left in place.
    assert!(output_dir.join("driver/com/foo/driver/TestDriver.java").is_file());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output_dir.join(REPORT_FILE_NAME)).unwrap()).unwrap();
    assert_eq!(report["failed_stage"], "comparability");
    assert_eq!(report["last_stage"], "aborted");
}

#[test]
fn test_compile_failure_stops_before_any_tool() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(FAKE_JAVA, FAILING_JAVAC);
    let unit = sandbox.project().validate(0).unwrap();

    let runner = SystemProcessRunner;
    let outcome = Pipeline::new(&config, &runner).run_unit(&unit);

    match &outcome.result {
        Err(PipelineError::Generation {
            source: GenerationError::Compile { diagnostics, .. },
            ..
        }) => assert_eq!(diagnostics, &vec!["TestDriver.java:3: error: ';' expected".to_string()]),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(outcome.report.failed_stage, Some(Stage::ResolveDriver));
    assert_eq!(sandbox.calls().len(), 1);
}

#[test]
fn test_hanging_tool_times_out() {
    let sandbox = Sandbox::new();
    let config = sandbox
        .config(HANGING_JAVA, FAKE_JAVAC)
        .with_timeouts(StageTimeouts {
            comparability: Some(1),
            ..StageTimeouts::default()
        });
    let unit = sandbox.project().validate(0).unwrap();

    let runner = SystemProcessRunner;
    let outcome = Pipeline::new(&config, &runner).run_unit(&unit);

    match &outcome.result {
        Err(PipelineError::ToolExecution { stage, source, .. }) => {
            assert_eq!(*stage, Stage::Comparability);
            assert!(matches!(source, ToolError::Timeout { .. }), "{source:?}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_configuration_errors_are_aggregated_before_spawning() {
    let sandbox = Sandbox::new();
    let config = sandbox.config(FAKE_JAVA, FAKE_JAVAC);

    let mut executor = UnitExecutor::for_toolchain(&config);
    executor.install(sandbox.project());
    executor.install(WorkUnitSpec {
        name: Some("broken".into()),
        classes_dir: Some(sandbox.root.join("missing")),
        ..WorkUnitSpec::default()
    });

    let runner = SystemProcessRunner;
    let pipeline = Pipeline::new(&config, &runner);
    match executor.execute(&pipeline) {
        Err(PipelineError::Configuration(aggregate)) => {
            assert_eq!(aggregate.len(), 3);
            let text = aggregate.to_string();
            assert!(text.starts_with("Work unit configuration errors:"));
            assert!(text.contains("3 error(s)"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(sandbox.calls().is_empty());
}
