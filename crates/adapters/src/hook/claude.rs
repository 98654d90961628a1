// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude Code adapter
//!
//! Claude Code posts PascalCase `hook_event_name` values with snake_case
//! fields (`tool_name`, `tool_input`, `tool_response`). Responses carry
//! `continue`/`decision`/`reason` plus a `hookSpecificOutput` block with
//! `additionalContext` on hook types that accept injection.

use super::common;
use super::HookAdapter;
use crate::AdapterError;
use gobby_core::{Decision, HookEvent, HookEventType, HookResponse, SessionSource};
use serde_json::{json, Value};

#[derive(Clone, Default)]
pub struct ClaudeAdapter;

fn event_type_for(hook_name: &str) -> HookEventType {
    match hook_name {
        "SessionStart" => HookEventType::SessionStart,
        "SessionEnd" => HookEventType::SessionEnd,
        "UserPromptSubmit" => HookEventType::BeforeAgent,
        "PreToolUse" => HookEventType::BeforeTool,
        "PostToolUse" => HookEventType::AfterTool,
        "Stop" => HookEventType::Stop,
        "PreCompact" => HookEventType::PreCompact,
        "SubagentStart" => HookEventType::SubagentStart,
        "SubagentStop" => HookEventType::SubagentStop,
        // Fail-open: unknown hook names are notifications.
        _ => HookEventType::Notification,
    }
}

impl HookAdapter for ClaudeAdapter {
    fn source(&self) -> SessionSource {
        SessionSource::Claude
    }

    fn translate_to_hook_event(&self, native: &Value) -> Result<HookEvent, AdapterError> {
        let hook_name = native
            .get("hook_event_name")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::MalformedPayload("missing hook_event_name".to_string()))?;
        let event_type = event_type_for(hook_name);

        let mut data = serde_json::Map::new();
        common::copy_fields(
            native,
            &["tool_name", "tool_input", "prompt", "transcript_path", "cwd", "trigger", "message"],
            &mut data,
        );
        common::rename_field(native, "tool_response", "tool_output", &mut data);
        data.insert("native_hook".to_string(), json!(hook_name));

        Ok(common::build_event(event_type, self.source(), native, data))
    }

    fn translate_from_hook_response(&self, response: &HookResponse, native: &Value) -> Value {
        let hook_name = native
            .get("hook_event_name")
            .and_then(Value::as_str)
            .unwrap_or("Notification");
        let event_type = event_type_for(hook_name);

        let mut out = serde_json::Map::new();
        out.insert("continue".to_string(), json!(!response.decision.is_block()));
        if response.decision.is_block() {
            out.insert("decision".to_string(), json!("block"));
            if let Some(reason) = &response.reason {
                out.insert("reason".to_string(), json!(reason));
            }
        }
        if let Some(message) = &response.system_message {
            out.insert("systemMessage".to_string(), json!(message));
        }
        // Context rides in hookSpecificOutput, only on accepting hooks and
        // only when the call was allowed.
        if response.decision == Decision::Allow && event_type.accepts_context() {
            if let Some(context) = &response.context {
                out.insert(
                    "hookSpecificOutput".to_string(),
                    json!({
                        "hookEventName": hook_name,
                        "additionalContext": context,
                    }),
                );
            }
        }
        Value::Object(out)
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
