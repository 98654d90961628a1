// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session entity
//!
//! One conversation between a user and an assistant CLI. Globally unique
//! on `(external_id, machine_id, source)`; rows are created on the first
//! hook from the CLI and updated in place afterwards.

use crate::event::SessionSource;
use serde::{Deserialize, Serialize};

/// Session lifecycle status, driven by hooks.
///
/// BEFORE_AGENT → active, AFTER_AGENT/STOP → paused, PRE_COMPACT →
/// handoff_ready, successful parent handoff → expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    HandoffReady,
    Expired,
    Archived,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::HandoffReady => "handoff_ready",
            Self::Expired => "expired",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            "handoff_ready" => Some(Self::HandoffReady),
            "expired" => Some(Self::Expired),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored session row. `id` is a UUIDv4 string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub external_id: String,
    pub machine_id: String,
    pub source: SessionSource,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: SessionStatus,
    /// Path to the CLI's transcript file, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonl_path: Option<String>,
    /// Summary produced at session end / handoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_markdown: Option<String>,
    /// Handoff context extracted at PRE_COMPACT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compact_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    /// Number of ancestors in the spawn chain (0 = root).
    #[serde(default)]
    pub agent_depth: u32,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub transcript_processed: bool,
}

impl Session {
    /// The unique tuple identifying this session across machines and CLIs.
    pub fn identity(&self) -> (&str, &str, SessionSource) {
        (&self.external_id, &self.machine_id, self.source)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
