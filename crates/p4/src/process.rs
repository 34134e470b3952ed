//! Single-shot subprocess execution.
//!
//! [`CommandSpec`] describes one invocation (argv or shell-string form,
//! optional stdin payload, working directory, output cap) and
//! [`ProcessRunner`] is the boundary trait that actually runs it. The
//! real implementation is [`TokioRunner`]; tests substitute fakes so no
//! process is ever spawned. One attempt per call: no retries, no
//! timeouts.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::P4Error;

/// Default cap on captured output per stream (1 MiB).
pub const DEFAULT_MAX_OUTPUT: usize = 1024 * 1024;

/// One fully-described command invocation. Built fresh per call and
/// never reused after being issued.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    stdin: Option<String>,
    cwd: PathBuf,
    max_output: usize,
}

impl CommandSpec {
    /// Build a spec from a program and an explicit argument list.
    pub fn argv<P, I, A, D>(program: P, args: I, cwd: D) -> Self
    where
        P: Into<PathBuf>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
        D: Into<PathBuf>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
            cwd: cwd.into(),
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }

    /// Build a spec that runs a whole command line through the platform
    /// shell. Failure handling downstream is identical to argv specs
    /// since both produce the same structure.
    pub fn shell<D: Into<PathBuf>>(command_line: impl Into<String>, cwd: D) -> Self {
        let (program, flag) = shell_invocation();
        Self {
            program: PathBuf::from(program),
            args: vec![flag.to_string(), command_line.into()],
            stdin: None,
            cwd: cwd.into(),
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }

    /// Attach a payload to feed to the subprocess's standard input.
    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    /// Override the output capture cap.
    pub fn max_output(mut self, limit: usize) -> Self {
        self.max_output = limit;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn stdin_payload(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Human-readable form of the invocation, for tracing and errors.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[cfg(windows)]
fn shell_invocation() -> (&'static str, &'static str) {
    ("cmd", "/C")
}

#[cfg(not(windows))]
fn shell_invocation() -> (&'static str, &'static str) {
    ("sh", "-c")
}

/// Captured result of one process invocation. Owned by the caller that
/// issued the command; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
    pub success: bool,
}

/// Boundary trait for running one external command to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the command once and report fully: a nonzero exit is a normal
    /// outcome with `success == false` and whatever partial output the
    /// process emitted. `Err` is reserved for not being able to run the
    /// command at all, or output exceeding the configured cap.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, P4Error>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Clone, Default)]
pub struct TokioRunner;

impl TokioRunner {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, P4Error> {
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.args())
            .current_dir(spec.cwd())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd.stdin(if spec.stdin_payload().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn()?;

        if let Some(payload) = spec.stdin_payload() {
            let mut pipe = child.stdin.take().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "child stdin not captured")
            })?;
            pipe.write_all(payload.as_bytes()).await?;
            pipe.shutdown().await?;
            // Drop closes the pipe so the child sees EOF.
            drop(pipe);
        }

        let output = child.wait_with_output().await?;

        if output.stdout.len() > spec.max_output || output.stderr.len() > spec.max_output {
            return Err(P4Error::OutputOverflow {
                limit: spec.max_output,
            });
        }

        Ok(CommandOutcome {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
            success: output.status.success(),
        })
    }
}
