// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified hook event model
//!
//! Every supported CLI front-end fires lifecycle hooks in its own wire
//! format; adapters normalize them into [`HookEvent`] and render the
//! unified [`HookResponse`] back into the CLI's expected shape. Nothing
//! past the adapter layer sees per-CLI vocabulary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Lifecycle hook types, closed set.
///
/// Unknown per-CLI hook names map to `Notification` (fail-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEventType {
    SessionStart,
    SessionEnd,
    BeforeAgent,
    AfterAgent,
    BeforeTool,
    AfterTool,
    Stop,
    PreCompact,
    Notification,
    SubagentStart,
    SubagentStop,
}

impl HookEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::BeforeAgent => "before_agent",
            Self::AfterAgent => "after_agent",
            Self::BeforeTool => "before_tool",
            Self::AfterTool => "after_tool",
            Self::Stop => "stop",
            Self::PreCompact => "pre_compact",
            Self::Notification => "notification",
            Self::SubagentStart => "subagent_start",
            Self::SubagentStop => "subagent_stop",
        }
    }

    /// Hook types whose CLI response channel accepts injected context.
    pub fn accepts_context(&self) -> bool {
        matches!(
            self,
            Self::SessionStart | Self::BeforeAgent | Self::BeforeTool | Self::PreCompact
        )
    }
}

impl std::fmt::Display for HookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which CLI front-end a session (and its hooks) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    Claude,
    Gemini,
    Codex,
    Cursor,
    Copilot,
}

impl SessionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Codex => "codex",
            Self::Cursor => "cursor",
            Self::Copilot => "copilot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "claude" => Some(Self::Claude),
            "gemini" => Some(Self::Gemini),
            "codex" => Some(Self::Codex),
            "cursor" => Some(Self::Cursor),
            "copilot" => Some(Self::Copilot),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized lifecycle hook from a CLI front-end.
///
/// `data` carries the canonical payload fields (`tool_name`, `tool_input`,
/// `tool_output`, `prompt`, `transcript_path`, ...); `metadata` carries
/// daemon-side annotations such as `_platform_session_id` added during
/// session resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookEvent {
    pub event_type: HookEventType,
    /// The CLI's own session identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub machine_id: String,
    pub source: SessionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// UTC ISO-8601 arrival time.
    pub timestamp: String,
    #[serde(default)]
    pub data: HashMap<String, Value>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl HookEvent {
    pub fn new(event_type: HookEventType, machine_id: impl Into<String>, source: SessionSource) -> Self {
        Self {
            event_type,
            external_id: None,
            machine_id: machine_id.into(),
            source,
            project_id: None,
            timestamp: crate::time_fmt::utc_now_iso(),
            data: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// Canonical tool name from the payload, empty when absent.
    pub fn tool_name(&self) -> &str {
        self.data.get("tool_name").and_then(Value::as_str).unwrap_or("")
    }

    /// Canonical tool input object from the payload.
    pub fn tool_input(&self) -> Option<&Value> {
        self.data.get("tool_input")
    }

    /// User prompt text, empty when absent.
    pub fn prompt(&self) -> &str {
        self.data.get("prompt").and_then(Value::as_str).unwrap_or("")
    }
}

/// Decision rendered back to the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[default]
    Allow,
    Deny,
    Block,
    Modify,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Block => "block",
            Self::Modify => "modify",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block | Self::Deny)
    }
}

/// Session-resolution annotations carried on a [`HookResponse`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Short `#N`-style reference when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(
        default,
        rename = "_first_hook_for_session",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub first_hook_for_session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_term_program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_parent_pid: Option<u32>,
}

/// The unified response composed by the hook pipeline.
///
/// `context` is merged into the hook output channel the CLI injects into
/// the model; `system_message` is surfaced to the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookResponse {
    #[serde(default)]
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    #[serde(default)]
    pub metadata: ResponseMetadata,
}

impl HookResponse {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self { decision: Decision::Block, reason: Some(reason.into()), ..Self::default() }
    }

    /// Append a context part, separating parts with a blank line.
    pub fn push_context(&mut self, part: &str) {
        if part.is_empty() {
            return;
        }
        match &mut self.context {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(part);
            }
            None => self.context = Some(part.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
