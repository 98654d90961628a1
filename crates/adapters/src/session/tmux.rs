// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux session adapter

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

const SESSION_PREFIX: &str = "gobby-";

/// Tmux-based session adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, SessionError> {
        // Precondition: cwd must exist
        if !cwd.exists() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }

        let session_id = format!("{SESSION_PREFIX}{name}");

        // Check if session already exists and clean it up
        let existing = Command::new("tmux")
            .args(["has-session", "-t", &session_id])
            .output()
            .await;
        if existing.map(|o| o.status.success()).unwrap_or(false) {
            tracing::warn!(session_id, "session already exists, killing first");
            let _ = Command::new("tmux")
                .args(["kill-session", "-t", &session_id])
                .output()
                .await;
        }

        let mut tmux_cmd = Command::new("tmux");
        tmux_cmd
            .arg("new-session")
            .arg("-d")
            .arg("-s")
            .arg(&session_id)
            .arg("-c")
            .arg(cwd);
        for (key, value) in env {
            tmux_cmd.arg("-e").arg(format!("{key}={value}"));
        }
        tmux_cmd.arg(cmd);

        let output = tmux_cmd
            .output()
            .await
            .map_err(|e| SessionError::SpawnFailed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session_id, stderr = %stderr, "tmux spawn failed");
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        // Log stderr even on success - may contain useful warnings
        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(session_id, stderr = %stderr, "tmux spawn stderr (non-fatal)");
        }

        Ok(session_id)
    }

    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError> {
        // -l = literal mode, -- = end of options (handles leading dashes)
        let output = Command::new("tmux")
            .args(["send-keys", "-t", id, "-l", "--", input])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        let _ = Command::new("tmux")
            .args(["send-keys", "-t", id, "Enter"])
            .output()
            .await;
        Ok(())
    }

    async fn is_running(&self, id: &str) -> bool {
        Command::new("tmux")
            .args(["has-session", "-t", id])
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        let output = Command::new("tmux")
            .args(["kill-session", "-t", id])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, SessionError> {
        let output = Command::new("tmux")
            .args(["list-sessions", "-F", "#{session_name}"])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            // No server running means no sessions.
            return Ok(Vec::new());
        }
        let names = String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| line.starts_with(SESSION_PREFIX))
            .map(str::to_string)
            .collect();
        Ok(names)
    }
}
