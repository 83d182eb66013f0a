//! Java compiler wrapper.

use std::path::{Path, PathBuf};

use crate::classpath::ClasspathSet;
use crate::config::ToolchainConfig;
use crate::process::{Command, ProcessError, ProcessRunner};

/// Result of one compiler run. Any diagnostic output counts as failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    pub success: bool,
    pub diagnostics: Vec<String>,
}

/// `javac -g -classpath <cp> -d <destination> <files>`.
#[derive(Debug, Clone)]
pub struct Javac<'a> {
    config: &'a ToolchainConfig,
    classpath: &'a ClasspathSet,
    destination: PathBuf,
    working_dir: Option<PathBuf>,
}

impl<'a> Javac<'a> {
    pub fn new(config: &'a ToolchainConfig, classpath: &'a ClasspathSet, destination: impl Into<PathBuf>) -> Self {
        Self {
            config,
            classpath,
            destination: destination.into(),
            working_dir: None,
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn command(&self, files: &[&Path]) -> Command {
        let mut command = Command::new(&self.config.compiler)
            .arg("-g")
            .arg("-classpath")
            .arg(self.classpath.join_paths())
            .arg("-d")
            .arg(self.destination.display().to_string())
            .args(files.iter().map(|f| f.display().to_string()))
            .permit_non_zero_exit(true)
            .timeout(self.config.timeouts.compile());
        if let Some(dir) = &self.working_dir {
            command = command.current_dir(dir);
        }
        command
    }

    pub fn compile(&self, runner: &dyn ProcessRunner, files: &[&Path]) -> Result<CompileOutcome, ProcessError> {
        let command = self.command(files);
        tracing::debug!(argv = %command, "compiling driver");
        let output = runner.run(&command)?;

        let mut diagnostics = output.lines;
        let exited_cleanly = output.exit_code == Some(0);
        if diagnostics.is_empty() && !exited_cleanly {
            diagnostics.push(match output.exit_code {
                Some(code) => format!("{} exited with code {code}", self.config.compiler),
                None => format!("{} was terminated by a signal", self.config.compiler),
            });
        }
        Ok(CompileOutcome {
            success: diagnostics.is_empty(),
            diagnostics,
        })
    }
}
