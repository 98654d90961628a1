// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codex CLI adapter
//!
//! Codex posts dotted lifecycle names (`tool.before`) with snake_case
//! fields. Responses use `decision` + optional `context`.

use super::common;
use super::HookAdapter;
use crate::AdapterError;
use gobby_core::{Decision, HookEvent, HookEventType, HookResponse, SessionSource};
use serde_json::{json, Value};

#[derive(Clone, Default)]
pub struct CodexAdapter;

fn event_type_for(hook_name: &str) -> HookEventType {
    match hook_name {
        "session.start" => HookEventType::SessionStart,
        "session.end" => HookEventType::SessionEnd,
        "agent.before" => HookEventType::BeforeAgent,
        "agent.after" => HookEventType::AfterAgent,
        "tool.before" => HookEventType::BeforeTool,
        "tool.after" => HookEventType::AfterTool,
        "stop" => HookEventType::Stop,
        "compact.before" => HookEventType::PreCompact,
        _ => HookEventType::Notification,
    }
}

impl HookAdapter for CodexAdapter {
    fn source(&self) -> SessionSource {
        SessionSource::Codex
    }

    fn translate_to_hook_event(&self, native: &Value) -> Result<HookEvent, AdapterError> {
        let hook_name = native
            .get("hook")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::MalformedPayload("missing hook".to_string()))?;
        let event_type = event_type_for(hook_name);

        let mut data = serde_json::Map::new();
        common::copy_fields(
            native,
            &["tool_name", "tool_input", "tool_output", "prompt", "cwd"],
            &mut data,
        );
        data.insert("native_hook".to_string(), json!(hook_name));

        Ok(common::build_event(event_type, self.source(), native, data))
    }

    fn translate_from_hook_response(&self, response: &HookResponse, native: &Value) -> Value {
        let hook_name = native.get("hook").and_then(Value::as_str).unwrap_or("notification");
        let event_type = event_type_for(hook_name);

        let mut out = serde_json::Map::new();
        out.insert("decision".to_string(), json!(response.decision.as_str()));
        if let Some(reason) = &response.reason {
            out.insert("reason".to_string(), json!(reason));
        }
        if response.decision == Decision::Allow && event_type.accepts_context() {
            if let Some(context) = &response.context {
                out.insert("context".to_string(), json!(context));
            }
        }
        Value::Object(out)
    }
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
