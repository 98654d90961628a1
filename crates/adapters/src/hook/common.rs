// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared normalization helpers for hook adapters

use gobby_core::{HookEvent, HookEventType, SessionSource};
use serde_json::Value;

/// Copy canonical fields out of a native payload into a fresh event.
///
/// Keys already canonical (`tool_name`, `tool_input`, `tool_output`,
/// `prompt`, `transcript_path`) pass through; adapters rename their
/// CLI-specific variants before calling this.
pub fn build_event(
    event_type: HookEventType,
    source: SessionSource,
    native: &Value,
    data: serde_json::Map<String, Value>,
) -> HookEvent {
    let machine_id = native
        .get("machine_id")
        .and_then(Value::as_str)
        .unwrap_or("local")
        .to_string();
    let mut event = HookEvent::new(event_type, machine_id, source);
    event.external_id = extract_session_id(native);
    event.project_id = native
        .get("project_id")
        .and_then(Value::as_str)
        .map(str::to_string);
    event.data = data.into_iter().collect();
    event
}

/// Session id under any of the names the CLIs use.
pub fn extract_session_id(native: &Value) -> Option<String> {
    for key in ["session_id", "sessionId", "conversation_id", "conversationId"] {
        if let Some(id) = native.get(key).and_then(Value::as_str) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}

/// Copy `keys` from the native payload into `data` unchanged when present.
pub fn copy_fields(
    native: &Value,
    keys: &[&str],
    data: &mut serde_json::Map<String, Value>,
) {
    for key in keys {
        if let Some(value) = native.get(*key) {
            if !value.is_null() {
                data.insert((*key).to_string(), value.clone());
            }
        }
    }
}

/// Insert `value` under `canonical` unless already present.
pub fn rename_field(
    native: &Value,
    from: &str,
    canonical: &str,
    data: &mut serde_json::Map<String, Value>,
) {
    if data.contains_key(canonical) {
        return;
    }
    if let Some(value) = native.get(from) {
        if !value.is_null() {
            data.insert(canonical.to_string(), value.clone());
        }
    }
}
