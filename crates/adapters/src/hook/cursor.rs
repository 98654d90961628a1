// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cursor CLI adapter
//!
//! Cursor uses camelCase hook names and fields like Copilot, but its
//! responses use a top-level `permission` field on tool hooks.

use super::common;
use super::HookAdapter;
use crate::AdapterError;
use gobby_core::{Decision, HookEvent, HookEventType, HookResponse, SessionSource};
use serde_json::{json, Value};

#[derive(Clone, Default)]
pub struct CursorAdapter;

fn event_type_for(hook_name: &str) -> HookEventType {
    match hook_name {
        "sessionStart" => HookEventType::SessionStart,
        "sessionEnd" => HookEventType::SessionEnd,
        "beforeSubmitPrompt" => HookEventType::BeforeAgent,
        "beforeToolCall" => HookEventType::BeforeTool,
        "afterToolCall" => HookEventType::AfterTool,
        "stop" => HookEventType::Stop,
        "beforeCompact" => HookEventType::PreCompact,
        _ => HookEventType::Notification,
    }
}

impl HookAdapter for CursorAdapter {
    fn source(&self) -> SessionSource {
        SessionSource::Cursor
    }

    fn translate_to_hook_event(&self, native: &Value) -> Result<HookEvent, AdapterError> {
        let hook_name = native
            .get("hookName")
            .or_else(|| native.get("hook_name"))
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::MalformedPayload("missing hookName".to_string()))?;
        let event_type = event_type_for(hook_name);

        let mut data = serde_json::Map::new();
        common::copy_fields(native, &["prompt", "cwd"], &mut data);
        common::rename_field(native, "toolName", "tool_name", &mut data);
        common::rename_field(native, "toolInput", "tool_input", &mut data);
        common::rename_field(native, "toolOutput", "tool_output", &mut data);
        data.insert("native_hook".to_string(), json!(hook_name));

        Ok(common::build_event(event_type, self.source(), native, data))
    }

    fn translate_from_hook_response(&self, response: &HookResponse, native: &Value) -> Value {
        let hook_name = native
            .get("hookName")
            .or_else(|| native.get("hook_name"))
            .and_then(Value::as_str)
            .unwrap_or("notification");
        let event_type = event_type_for(hook_name);

        let mut out = serde_json::Map::new();
        if event_type == HookEventType::BeforeTool {
            let permission = if response.decision.is_block() { "deny" } else { "allow" };
            out.insert("permission".to_string(), json!(permission));
        } else {
            out.insert("continue".to_string(), json!(!response.decision.is_block()));
        }
        if let Some(reason) = &response.reason {
            out.insert("userMessage".to_string(), json!(reason));
        }
        if response.decision == Decision::Allow && event_type.accepts_context() {
            if let Some(context) = &response.context {
                out.insert("attachments".to_string(), json!([{ "type": "text", "text": context }]));
            }
        }
        Value::Object(out)
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
