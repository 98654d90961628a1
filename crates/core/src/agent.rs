// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running agent model
//!
//! [`RunningAgent`] is in-memory only: it tracks runtime state (PIDs, PTY
//! fds, spawn mode) that does not belong in the database. The registry in
//! the engine crate owns every instance; rows are destroyed on exit or
//! cleanup.

use crate::id::{IdTag, TaggedId};
use serde::{Deserialize, Serialize};

/// Id family for agent runs, tagged `ar`.
pub struct AgentRunTag;

impl IdTag for AgentRunTag {
    const TAG: &'static str = "ar";
}

pub type AgentRunId = TaggedId<AgentRunTag>;

/// Id family for worktrees, tagged `wt`.
pub struct WorktreeTag;

impl IdTag for WorktreeTag {
    const TAG: &'static str = "wt";
}

pub type WorktreeId = TaggedId<WorktreeTag>;

/// How a child agent process is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Async task inside the daemon executing the assistant SDK directly.
    InProcess,
    /// Detached terminal (tmux / iTerm / Ghostty) with a composed command.
    Terminal,
    /// PTY whose master fd is retained for I/O bridging.
    Embedded,
    /// Background subprocess with stdio redirected to log files.
    Headless,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProcess => "in_process",
            Self::Terminal => "terminal",
            Self::Embedded => "embedded",
            Self::Headless => "headless",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_process" => Some(Self::InProcess),
            "terminal" => Some(Self::Terminal),
            "embedded" => Some(Self::Embedded),
            "headless" => Some(Self::Headless),
            _ => None,
        }
    }
}

/// Working-directory isolation applied to a child agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// Git worktree off the base branch.
    Worktree,
    /// Separate working copy.
    Clone,
}

impl IsolationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worktree => "worktree",
            Self::Clone => "clone",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "worktree" => Some(Self::Worktree),
            "clone" => Some(Self::Clone),
            _ => None,
        }
    }
}

/// In-memory record of a live child agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningAgent {
    pub run_id: AgentRunId,
    /// Child session id for this agent.
    pub session_id: String,
    /// Parent session that spawned this agent.
    pub parent_session_id: String,
    pub mode: AgentMode,
    /// UTC ISO-8601 start time.
    pub started_at: String,
    /// Process id when running externally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// PTY master fd (embedded mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_fd: Option<i32>,
    /// Terminal program (tmux, iterm, ghostty) for terminal mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_type: Option<String>,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_id: Option<WorktreeId>,
}

/// Durable record of an engine-created worktree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worktree {
    pub id: WorktreeId,
    pub project_id: String,
    pub path: String,
    pub branch: String,
    pub status: String,
    pub created_at: String,
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
