//! External process execution
//!
//! Every tool the pipeline drives (the three analysis stages and the Java
//! compiler) goes through a [`ProcessRunner`]. The runner merges stdout and
//! stderr into one line sequence because tool failure is read from output
//! content rather than from exit status.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// Command description
// ============================================================================

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// When set, a non-zero exit is returned as a normal output
    pub permit_non_zero_exit: bool,
    pub timeout: Option<Duration>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            permit_non_zero_exit: false,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn permit_non_zero_exit(mut self, permit: bool) -> Self {
        self.permit_non_zero_exit = permit;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// stdout and stderr lines, merged in arrival order
    pub lines: Vec<String>,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    /// Lines starting with any of `markers`, in output order.
    pub fn lines_starting_with(&self, markers: &[&str]) -> Vec<String> {
        self.lines
            .iter()
            .filter(|line| markers.iter().any(|m| line.starts_with(m)))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` was killed after {}s", .timeout.as_secs())]
    Timeout {
        program: String,
        timeout: Duration,
        lines: Vec<String>,
    },

    #[error("`{program}` exited with {}:\n{}", describe_exit(.code), .lines.join("\n"))]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        lines: Vec<String>,
    },
}

// ============================================================================
// Runner seam
// ============================================================================

/// Execute commands synchronously.
///
/// The pipeline only talks to processes through this trait so tests can record
/// invocations without spawning anything.
pub trait ProcessRunner {
    fn run(&self, command: &Command) -> Result<ProcessOutput, ProcessError>;

    /// Whether `program` could be started at all.
    fn can_launch(&self, program: &str) -> bool {
        program_exists(program)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, command: &Command) -> Result<ProcessOutput, ProcessError> {
        (**self).run(command)
    }

    fn can_launch(&self, program: &str) -> bool {
        (**self).can_launch(program)
    }
}

/// Runs real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &Command) -> Result<ProcessOutput, ProcessError> {
        tracing::debug!(argv = %command, cwd = ?command.working_dir, "spawning");

        let mut std_command = StdCommand::new(&command.program);
        std_command
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.working_dir {
            std_command.current_dir(dir);
        }

        let mut child = std_command.spawn().map_err(|source| ProcessError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, tx.clone()));
        }
        drop(tx);

        let status = match wait_with_timeout(&mut child, command.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                // Grandchildren may still hold the pipes; take what arrived and leave the readers.
                let lines = rx.try_iter().collect();
                return Err(ProcessError::Timeout {
                    program: command.program.clone(),
                    timeout: command.timeout.unwrap_or_default(),
                    lines,
                });
            }
            Err(source) => {
                return Err(ProcessError::Wait {
                    program: command.program.clone(),
                    source,
                });
            }
        };

        for reader in readers {
            let _ = reader.join();
        }
        let lines: Vec<String> = rx.into_iter().collect();
        let exit_code = status.code();
        tracing::debug!(program = %command.program, ?exit_code, lines = lines.len(), "process finished");

        if !status.success() && !command.permit_non_zero_exit {
            return Err(ProcessError::NonZeroExit {
                program: command.program.clone(),
                code: exit_code,
                lines,
            });
        }
        Ok(ProcessOutput { lines, exit_code })
    }
}

fn spawn_line_reader<R: Read + Send + 'static>(stream: R, tx: Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for chunk in BufReader::new(stream).split(b'\n') {
            let Ok(bytes) = chunk else { break };
            let mut line = String::from_utf8_lossy(&bytes).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            if tx.send(line).is_err() {
                break;
            }
        }
    })
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Wait for `child`, killing it once `timeout` elapses. `Ok(None)` means it was killed.
fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };
    let started_at = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started_at.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Whether `program` can be found as given or on `PATH`.
pub fn program_exists(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}
