// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal session adapters
//!
//! The agent runner spawns terminal-mode children through this trait so
//! tests can swap in a fake. Tmux is the primary implementation.

mod tmux;

pub use tmux::TmuxAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSessionAdapter;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to spawn session: {0}")]
    SpawnFailed(String),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// A detached terminal session host.
#[async_trait]
pub trait SessionAdapter: Send + Sync {
    /// Spawn a detached session running `cmd` in `cwd`; returns the
    /// session id.
    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<String, SessionError>;

    /// Send keystrokes to a session.
    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError>;

    /// Whether the session is still alive.
    async fn is_running(&self, id: &str) -> bool;

    /// Kill a session.
    async fn kill(&self, id: &str) -> Result<(), SessionError>;

    /// List live session ids under this adapter's namespace.
    async fn list(&self) -> Result<Vec<String>, SessionError>;
}
