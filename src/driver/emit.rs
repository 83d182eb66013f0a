//! Driver source emission, one function per strategy.

use serde::Serialize;

use super::DriverSpec;
use super::writer::CodeWriter;

/// Shape of the generated driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Instantiates each test class and calls its test methods
    Direct,
    /// Hands every test class to `JUnitCore.runClasses`
    JUnit4,
    /// Discovery request against the driver package through the platform launcher
    JUnit5,
}

const HEADER_COMMENT: &str = "Auto-generated class.";

const JUNIT5_IMPORTS: &[&str] = &[
    "java.io.PrintWriter",
    "org.junit.platform.launcher.Launcher",
    "org.junit.platform.launcher.LauncherDiscoveryRequest",
    "org.junit.platform.launcher.core.LauncherDiscoveryRequestBuilder",
    "org.junit.platform.launcher.core.LauncherFactory",
    "org.junit.platform.launcher.listeners.SummaryGeneratingListener",
    "org.junit.platform.launcher.listeners.TestExecutionSummary",
];

const JUNIT5_STATIC_IMPORTS: &[&str] = &[
    "org.junit.platform.engine.discovery.ClassNameFilter.includeClassNamePatterns",
    "org.junit.platform.engine.discovery.DiscoverySelectors.selectPackage",
];

const JUNIT4_IMPORTS: &[&str] = &["org.junit.runner.JUnitCore", "org.junit.runner.Result"];

/// Render the driver source for `spec`.
pub fn render(spec: &DriverSpec, kind: DriverKind, class_name: &str) -> String {
    let mut w = CodeWriter::new();
    w.line(&format!("package {};", spec.package));
    w.blank_line();

    match kind {
        DriverKind::Direct => emit_direct(&mut w, spec, class_name),
        DriverKind::JUnit4 => emit_junit4(&mut w, spec, class_name),
        DriverKind::JUnit5 => emit_junit5(&mut w, spec, class_name),
    }
    w.finish()
}

fn emit_imports(w: &mut CodeWriter, imports: &[&str], prefix: &str) {
    for import in imports {
        w.line(&format!("import {prefix}{import};"));
    }
    w.blank_line();
}

fn emit_direct(w: &mut CodeWriter, spec: &DriverSpec, class_name: &str) {
    w.comment(HEADER_COMMENT);
    w.block(&format!("public final class {class_name}"), |w| {
        w.blank_line();
        w.block("public void runAll() throws Exception", |w| {
            let instantiable = spec.classes.iter().filter(|c| c.has_source);
            for (index, class) in instantiable.enumerate() {
                if index > 0 {
                    w.blank_line();
                }
                let instance = format!("testClass{}", index + 1);
                w.line(&format!("{name} {instance} = new {name}();", name = class.name));
                for method in &class.methods {
                    w.line(&format!("{instance}.{method}();"));
                }
            }
        });
        w.blank_line();
        emit_main(w, class_name, &[]);
    });
}

fn emit_junit4(w: &mut CodeWriter, spec: &DriverSpec, class_name: &str) {
    emit_imports(w, JUNIT4_IMPORTS, "");
    w.comment(HEADER_COMMENT);
    w.block(&format!("public final class {class_name}"), |w| {
        w.blank_line();
        w.block("public static void main(String... args) throws Exception", |w| {
            let classes = spec
                .classes
                .iter()
                .map(|c| format!("{}.class", c.name))
                .collect::<Vec<_>>()
                .join(", ");
            w.line(&format!("final Result result = JUnitCore.runClasses({classes});"));
            w.line("System.out.printf(\"Test ran: %s, Failed: %s%n\",");
            w.continuation(&["result.getRunCount(), result.getFailureCount());"]);
        });
    });
}

fn emit_junit5(w: &mut CodeWriter, spec: &DriverSpec, class_name: &str) {
    emit_imports(w, JUNIT5_IMPORTS, "");
    emit_imports(w, JUNIT5_STATIC_IMPORTS, "static ");
    w.comment(HEADER_COMMENT);
    w.block(&format!("public final class {class_name}"), |w| {
        w.blank_line();
        w.line("private final SummaryGeneratingListener listener = new SummaryGeneratingListener();");
        w.blank_line();
        w.block("public void runAll()", |w| {
            let selectors = format!(".selectors(selectPackage(\"{}\"))", spec.package);
            w.line("LauncherDiscoveryRequest request = LauncherDiscoveryRequestBuilder.request()");
            w.continuation(&[
                selectors.as_str(),
                ".filters(includeClassNamePatterns(\".*Test\"))",
                ".build();",
            ]);
            w.line("Launcher launcher = LauncherFactory.create();");
            w.line("launcher.registerTestExecutionListeners(listener);");
            w.line("launcher.execute(request);");
        });
        w.blank_line();
        emit_main(
            w,
            class_name,
            &[
                "TestExecutionSummary summary = runner.listener.getSummary();",
                "PrintWriter out = new PrintWriter(System.out, true);",
                "summary.printTo(out);",
                "out.flush();",
            ],
        );
    });
}

fn emit_main(w: &mut CodeWriter, class_name: &str, trailer: &[&str]) {
    w.block("public static void main(String... args) throws Exception", |w| {
        w.line(&format!("{class_name} runner = new {class_name}();"));
        w.line("runner.runAll();");
        for line in trailer {
            w.line(line);
        }
    });
}
