// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gemini CLI adapter
//!
//! Gemini posts snake_case hook names with `tool_args` for input. Its
//! PRE_COMPACT fires spuriously; the event handlers treat it as a no-op
//! for this source (the adapter still translates it faithfully).

use super::common;
use super::HookAdapter;
use crate::AdapterError;
use gobby_core::{Decision, HookEvent, HookEventType, HookResponse, SessionSource};
use serde_json::{json, Value};

#[derive(Clone, Default)]
pub struct GeminiAdapter;

fn event_type_for(hook_name: &str) -> HookEventType {
    match hook_name {
        "session_start" => HookEventType::SessionStart,
        "session_end" => HookEventType::SessionEnd,
        "prompt_submit" => HookEventType::BeforeAgent,
        "pre_tool_use" => HookEventType::BeforeTool,
        "post_tool_use" => HookEventType::AfterTool,
        "stop" => HookEventType::Stop,
        "pre_compact" => HookEventType::PreCompact,
        "subagent_start" => HookEventType::SubagentStart,
        "subagent_stop" => HookEventType::SubagentStop,
        _ => HookEventType::Notification,
    }
}

impl HookAdapter for GeminiAdapter {
    fn source(&self) -> SessionSource {
        SessionSource::Gemini
    }

    fn translate_to_hook_event(&self, native: &Value) -> Result<HookEvent, AdapterError> {
        let hook_name = native
            .get("hook_name")
            .or_else(|| native.get("event"))
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::MalformedPayload("missing hook_name".to_string()))?;
        let event_type = event_type_for(hook_name);

        let mut data = serde_json::Map::new();
        common::copy_fields(
            native,
            &["tool_name", "prompt", "transcript_path", "cwd", "message"],
            &mut data,
        );
        common::rename_field(native, "tool_args", "tool_input", &mut data);
        common::rename_field(native, "tool_result", "tool_output", &mut data);
        data.insert("native_hook".to_string(), json!(hook_name));

        Ok(common::build_event(event_type, self.source(), native, data))
    }

    fn translate_from_hook_response(&self, response: &HookResponse, native: &Value) -> Value {
        let hook_name = native
            .get("hook_name")
            .or_else(|| native.get("event"))
            .and_then(Value::as_str)
            .unwrap_or("notification");
        let event_type = event_type_for(hook_name);

        let mut out = serde_json::Map::new();
        out.insert("allow".to_string(), json!(!response.decision.is_block()));
        if let Some(reason) = &response.reason {
            out.insert("reason".to_string(), json!(reason));
        }
        if response.decision == Decision::Allow && event_type.accepts_context() {
            if let Some(context) = &response.context {
                out.insert("context".to_string(), json!(context));
            }
        }
        if let Some(message) = &response.system_message {
            out.insert("message".to_string(), json!(message));
        }
        Value::Object(out)
    }
}

#[cfg(test)]
#[path = "gemini_tests.rs"]
mod tests;
