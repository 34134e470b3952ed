//! Command execution with tracing and a per-call failure policy.

use std::sync::Arc;

use tracing::{error, trace, warn};

use crate::error::P4Error;
use crate::process::{CommandOutcome, CommandSpec, ProcessRunner};

/// Runs [`CommandSpec`]s through a [`ProcessRunner`], tracing every
/// command and applying one of two failure policies:
///
/// - [`run`](Self::run) — strict: a failing command becomes
///   [`P4Error::CommandFailed`] carrying the exit code and both streams.
/// - [`run_tolerant`](Self::run_tolerant) — permissive: a failing
///   command is returned as a plain [`CommandOutcome`] and the caller
///   decides what to do with it.
///
/// Both policies behave identically for argv-built and shell-built
/// specs.
pub struct CommandExecutor {
    runner: Arc<dyn ProcessRunner>,
    verbose: bool,
}

impl CommandExecutor {
    pub fn new(runner: Arc<dyn ProcessRunner>, verbose: bool) -> Self {
        Self { runner, verbose }
    }

    /// Run a command, failing hard on a nonzero exit. Returns captured
    /// stdout on success.
    pub async fn run(&self, spec: &CommandSpec) -> Result<String, P4Error> {
        let outcome = self.run_traced(spec).await?;

        if outcome.success {
            return Ok(outcome.stdout);
        }

        let command = spec.command_line();
        error!("Failure due to error in command.");
        warn!("Command: {command}");
        warn!("Error code: {:?}", outcome.code);
        warn!("== Stdout ==\n{}", outcome.stdout);
        warn!("== Stderr ==\n{}", outcome.stderr);

        Err(P4Error::CommandFailed {
            command,
            code: outcome.code,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
        })
    }

    /// Run a command, returning the outcome whether or not it failed.
    /// Only infrastructure problems (spawn failure, output overflow)
    /// are errors here.
    pub async fn run_tolerant(&self, spec: &CommandSpec) -> Result<CommandOutcome, P4Error> {
        self.run_traced(spec).await
    }

    async fn run_traced(&self, spec: &CommandSpec) -> Result<CommandOutcome, P4Error> {
        trace!(cwd = ?spec.cwd(), "Running command: {}", spec.command_line());

        let outcome = self.runner.run(spec).await?;

        if self.verbose {
            trace!("== Stdout ==\n{}", outcome.stdout);
            trace!("== Stderr ==\n{}", outcome.stderr);
        }

        Ok(outcome)
    }
}
