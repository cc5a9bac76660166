//! External process execution.
//!
//! Every tool the workflow drives goes through [`CommandRunner`], so the
//! orchestrator can be tested with a fake that never spawns a binary.

use crate::error::StageError;
use std::ffi::OsString;
use std::process::Command;

/// Captured result of one blocking process invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    /// A successful, silent run
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into `StageError::ToolFailed`
    pub fn check(self, tool: &str) -> Result<Self, StageError> {
        if self.success() {
            Ok(self)
        } else {
            Err(StageError::ToolFailed {
                tool: tool.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs an external program to completion
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, blocking until it exits.
    ///
    /// Only a failure to start the process is an `Err`; a non-zero exit
    /// is reported through [`CommandOutput::code`].
    fn execute(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, StageError>;
}

/// Spawns real processes with `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn execute(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, StageError> {
        tracing::debug!(tool = program, args = ?args, "Running command");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| StageError::Spawn {
                tool: program.to_string(),
                source,
            })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        };

        if !result.stdout.is_empty() {
            tracing::trace!(tool = program, stdout = %result.stdout);
        }
        if !result.success() {
            tracing::error!(
                tool = program,
                code = ?result.code,
                stderr = %result.stderr.trim(),
                "Command failed"
            );
        }

        Ok(result)
    }
}

/// Logs commands instead of running them
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn execute(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, StageError> {
        tracing::info!(tool = program, args = ?args, "Would run command");
        Ok(CommandOutput::ok())
    }
}
