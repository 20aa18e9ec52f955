//! `_util` module: run a host subprocess on behalf of a check

use std::process::{Command, Stdio};

use crate::error::{BridgeError, BridgeResult};

/// Captured result of a subprocess run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubprocessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, -1 when the process was killed by a signal
    pub exit_code: i32,
}

/// Runs subprocesses for checks
#[cfg_attr(test, mockall::automock)]
pub trait SubprocessRunner: Send + Sync {
    /// Run `argv` to completion and capture its output
    ///
    /// With `raise_on_empty`, an empty stdout is reported as an error.
    fn run(&self, argv: &[String], raise_on_empty: bool) -> BridgeResult<SubprocessOutput>;
}

/// [`SubprocessRunner`] using `std::process::Command`
#[derive(Debug, Default)]
pub struct CommandRunner;

impl SubprocessRunner for CommandRunner {
    fn run(&self, argv: &[String], raise_on_empty: bool) -> BridgeResult<SubprocessOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| BridgeError::Subprocess("empty command".to_string()))?;

        tracing::debug!(program = %program, args = args.len(), "Running subprocess for check");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| BridgeError::Subprocess(format!("failed to run {}: {}", program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if raise_on_empty && stdout.is_empty() {
            return Err(BridgeError::Subprocess(format!(
                "get_subprocess_output expected output but had none: {}",
                program
            )));
        }

        Ok(SubprocessOutput {
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
