// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess helpers with timeouts
//!
//! Shell steps and git calls run through here. Output capture is bounded
//! by a wall-clock timeout; a timed-out child is killed.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Default timeout for pipeline exec steps.
pub const SHELL_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);
/// Timeout for quick git queries (status, ls-files).
pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to start command: {0}")]
    Start(String),
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
    #[error("command io error: {0}")]
    Io(String),
}

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `sh -c <command>` in `cwd`, killing the child on timeout.
pub async fn run_with_timeout(
    command: &str,
    cwd: &Path,
    env: &[(String, String)],
    timeout: Duration,
) -> Result<CommandOutput, SubprocessError> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in env {
        cmd.env(key, value);
    }

    let child = cmd.spawn().map_err(|e| SubprocessError::Start(e.to_string()))?;
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| SubprocessError::Timeout(timeout))?
        .map_err(|e| SubprocessError::Io(e.to_string()))?;

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run a git subcommand in `repo`, returning stdout on success.
pub async fn run_git(repo: &Path, args: &[&str]) -> Result<CommandOutput, SubprocessError> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(repo)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let child = cmd.spawn().map_err(|e| SubprocessError::Start(e.to_string()))?;
    let output = tokio::time::timeout(GIT_COMMAND_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| SubprocessError::Timeout(GIT_COMMAND_TIMEOUT))?
        .map_err(|e| SubprocessError::Io(e.to_string()))?;
    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
