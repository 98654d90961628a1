// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub Copilot CLI adapter
//!
//! Copilot uses camelCase hook names (`preToolUse`) and camelCase fields:
//! `toolName`, `toolArgs`, and `toolResult.textResultForLlm` for output.
//! Responses use `permissionDecision` (allow/deny) and echo the hook name
//! in PascalCase inside `hookSpecificOutput`.

use super::common;
use super::HookAdapter;
use crate::AdapterError;
use gobby_core::{Decision, HookEvent, HookEventType, HookResponse, SessionSource};
use serde_json::{json, Value};

#[derive(Clone, Default)]
pub struct CopilotAdapter;

fn event_type_for(hook_name: &str) -> HookEventType {
    match hook_name {
        "sessionStart" => HookEventType::SessionStart,
        "sessionEnd" => HookEventType::SessionEnd,
        "userPromptSubmitted" => HookEventType::BeforeAgent,
        "preToolUse" => HookEventType::BeforeTool,
        "postToolUse" => HookEventType::AfterTool,
        "stop" => HookEventType::Stop,
        "preCompact" => HookEventType::PreCompact,
        // errorOccurred and anything unknown fail open as notifications.
        _ => HookEventType::Notification,
    }
}

/// PascalCase event name echoed back inside `hookSpecificOutput`.
fn response_event_name(hook_name: &str) -> &'static str {
    match hook_name {
        "sessionStart" => "SessionStart",
        "sessionEnd" => "SessionEnd",
        "userPromptSubmitted" => "UserPromptSubmitted",
        "stop" => "Stop",
        "preToolUse" => "PreToolUse",
        "postToolUse" => "PostToolUse",
        "preCompact" => "PreCompact",
        _ => "Notification",
    }
}

impl HookAdapter for CopilotAdapter {
    fn source(&self) -> SessionSource {
        SessionSource::Copilot
    }

    fn translate_to_hook_event(&self, native: &Value) -> Result<HookEvent, AdapterError> {
        let hook_name = native
            .get("hook_type")
            .or_else(|| native.get("hookType"))
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::MalformedPayload("missing hook_type".to_string()))?;
        let event_type = event_type_for(hook_name);

        let mut data = serde_json::Map::new();
        common::copy_fields(native, &["prompt", "cwd"], &mut data);
        common::rename_field(native, "toolName", "tool_name", &mut data);
        common::rename_field(native, "toolArgs", "tool_input", &mut data);
        // Output nests under toolResult.textResultForLlm; an error result
        // sets is_error.
        if let Some(result) = native.get("toolResult") {
            if let Some(text) = result.get("textResultForLlm").and_then(Value::as_str) {
                data.insert("tool_output".to_string(), json!(text));
            }
            if result.get("resultType").and_then(Value::as_str) == Some("error") {
                data.insert("is_error".to_string(), json!(true));
            }
        }
        data.insert("native_hook".to_string(), json!(hook_name));

        Ok(common::build_event(event_type, self.source(), native, data))
    }

    fn translate_from_hook_response(&self, response: &HookResponse, native: &Value) -> Value {
        let hook_name = native
            .get("hook_type")
            .or_else(|| native.get("hookType"))
            .and_then(Value::as_str)
            .unwrap_or("notification");
        let event_type = event_type_for(hook_name);

        let mut out = serde_json::Map::new();
        if event_type == HookEventType::BeforeTool {
            let permission = if response.decision.is_block() { "deny" } else { "allow" };
            out.insert("permissionDecision".to_string(), json!(permission));
            if let Some(reason) = &response.reason {
                out.insert("permissionDecisionReason".to_string(), json!(reason));
            }
        } else if response.decision.is_block() {
            out.insert("decision".to_string(), json!("deny"));
            if let Some(reason) = &response.reason {
                out.insert("reason".to_string(), json!(reason));
            }
        }
        if let Some(message) = &response.system_message {
            out.insert("systemMessage".to_string(), json!(message));
        }
        if response.decision == Decision::Allow && event_type.accepts_context() {
            if let Some(context) = &response.context {
                out.insert(
                    "hookSpecificOutput".to_string(),
                    json!({
                        "hookEventName": response_event_name(hook_name),
                        "additionalContext": context,
                    }),
                );
            }
        }
        Value::Object(out)
    }
}

#[cfg(test)]
#[path = "copilot_tests.rs"]
mod tests;
