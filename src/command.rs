//! Abstraction over external process invocation (`rsync`, `cp -al`,
//! the configured mailer) so the engine's orchestration logic is
//! testable without those binaries being present.

use std::collections::VecDeque;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use crate::error::{Result, SnapbackError};

/// The captured result of running an external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs external programs. Implemented for real invocation and, for
/// tests, a scripted in-memory double.
pub trait CommandRunner: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned (not if it
    /// merely exits non-zero — callers inspect `CommandOutput::status`).
    fn run(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput>;

    /// Like `run`, but feeds `stdin_data` to the child's standard input
    /// before waiting for it to exit. Used for the mail submission
    /// program, which reads headers and body on stdin (spec.md §6).
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or its stdin
    /// cannot be written.
    fn run_with_stdin(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        stdin_data: &str,
    ) -> Result<CommandOutput>;
}

/// Spawns real child processes via `std::process::Command`.
#[derive(Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd.output().map_err(|e| {
            SnapbackError::Other(anyhow::anyhow!("failed to spawn {program}: {e}"))
        })?;
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_with_stdin(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        stdin_data: &str,
    ) -> Result<CommandOutput> {
        use std::io::Write;
        use std::process::Stdio;

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            SnapbackError::Other(anyhow::anyhow!("failed to spawn {program}: {e}"))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(stdin_data.as_bytes()).map_err(|e| {
                SnapbackError::Other(anyhow::anyhow!("failed writing to {program} stdin: {e}"))
            })?;
        }

        let output = child.wait_with_output().map_err(|e| {
            SnapbackError::Other(anyhow::anyhow!("failed waiting on {program}: {e}"))
        })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A single recorded invocation, for assertions in tests.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<std::path::PathBuf>,
    pub stdin: Option<String>,
}

/// A scripted `CommandRunner` double: returns queued outputs in order
/// and records every call it received.
#[derive(Default)]
pub struct MockCommandRunner {
    queued: Mutex<VecDeque<Result<CommandOutput>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockCommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response to be returned by the next `run` call.
    pub fn push_success(&self, stdout: impl Into<String>) {
        self.queued.lock().unwrap().push_back(Ok(CommandOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }));
    }

    /// Queue a non-zero-exit response.
    pub fn push_failure(&self, status: i32, stderr: impl Into<String>) {
        self.queued.lock().unwrap().push_back(Ok(CommandOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }));
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(&self, program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
            cwd: cwd.map(Path::to_path_buf),
            stdin: None,
        });
        self.queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(CommandOutput {
                    status: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            })
    }

    fn run_with_stdin(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        stdin_data: &str,
    ) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
            cwd: cwd.map(Path::to_path_buf),
            stdin: Some(stdin_data.to_string()),
        });
        self.queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(CommandOutput {
                    status: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                })
            })
    }
}
