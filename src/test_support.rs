//! In-process fakes shared by unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

use crate::process::{Command, ProcessError, ProcessOutput, ProcessRunner};

enum Scripted {
    Output(ProcessOutput),
    SpawnFailure,
}

/// Records every command and replies with scripted outputs in order.
///
/// Once the script is exhausted every call succeeds with no output.
#[derive(Default)]
pub struct RecordingRunner {
    script: RefCell<VecDeque<Scripted>>,
    calls: RefCell<Vec<Command>>,
    missing: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, lines: &[&str], exit_code: Option<i32>) -> Self {
        self.script.borrow_mut().push_back(Scripted::Output(ProcessOutput {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            exit_code,
        }));
        self
    }

    pub fn fail_spawn(self) -> Self {
        self.script.borrow_mut().push_back(Scripted::SpawnFailure);
        self
    }

    /// Report `program` as not installed.
    pub fn missing_program(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Command> {
        self.calls.borrow().clone()
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, command: &Command) -> Result<ProcessOutput, ProcessError> {
        self.calls.borrow_mut().push(command.clone());
        match self.script.borrow_mut().pop_front() {
            Some(Scripted::Output(output)) => {
                if output.exit_code != Some(0) && !command.permit_non_zero_exit {
                    return Err(ProcessError::NonZeroExit {
                        program: command.program.clone(),
                        code: output.exit_code,
                        lines: output.lines,
                    });
                }
                Ok(output)
            }
            Some(Scripted::SpawnFailure) => Err(ProcessError::Spawn {
                program: command.program.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            }),
            None => Ok(ProcessOutput {
                lines: Vec::new(),
                exit_code: Some(0),
            }),
        }
    }

    fn can_launch(&self, program: &str) -> bool {
        !self.missing.iter().any(|m| m == program)
    }
}
