// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn adapter() -> ClaudeAdapter {
    ClaudeAdapter
}

#[parameterized(
    session_start = { "SessionStart", HookEventType::SessionStart },
    prompt = { "UserPromptSubmit", HookEventType::BeforeAgent },
    pre_tool = { "PreToolUse", HookEventType::BeforeTool },
    post_tool = { "PostToolUse", HookEventType::AfterTool },
    stop = { "Stop", HookEventType::Stop },
    pre_compact = { "PreCompact", HookEventType::PreCompact },
    unknown = { "SomethingNew", HookEventType::Notification },
)]
fn hook_name_mapping(name: &str, expected: HookEventType) {
    let native = json!({"hook_event_name": name, "session_id": "s1"});
    let event = adapter().translate_to_hook_event(&native).unwrap();
    assert_eq!(event.event_type, expected);
    assert_eq!(event.external_id.as_deref(), Some("s1"));
}

#[test]
fn tool_fields_normalize() {
    let native = json!({
        "hook_event_name": "PostToolUse",
        "session_id": "s1",
        "tool_name": "Bash",
        "tool_input": {"command": "ls"},
        "tool_response": "file.txt",
    });
    let event = adapter().translate_to_hook_event(&native).unwrap();
    assert_eq!(event.tool_name(), "Bash");
    assert_eq!(event.data.get("tool_output"), Some(&json!("file.txt")));
}

#[test]
fn missing_hook_name_is_malformed() {
    assert!(adapter().translate_to_hook_event(&json!({"session_id": "s1"})).is_err());
}

#[test]
fn allow_with_context_emits_hook_specific_output() {
    let native = json!({"hook_event_name": "UserPromptSubmit"});
    let response = HookResponse {
        context: Some("remember X".to_string()),
        ..HookResponse::allow()
    };
    let out = adapter().translate_from_hook_response(&response, &native);
    assert_eq!(out["continue"], json!(true));
    assert_eq!(out["hookSpecificOutput"]["hookEventName"], json!("UserPromptSubmit"));
    assert_eq!(out["hookSpecificOutput"]["additionalContext"], json!("remember X"));
}

#[test]
fn context_suppressed_on_non_accepting_hook() {
    let native = json!({"hook_event_name": "PostToolUse"});
    let response = HookResponse {
        context: Some("ctx".to_string()),
        ..HookResponse::allow()
    };
    let out = adapter().translate_from_hook_response(&response, &native);
    assert!(out.get("hookSpecificOutput").is_none());
}

#[test]
fn block_renders_decision_and_reason() {
    let native = json!({"hook_event_name": "PreToolUse"});
    let response = HookResponse::block("Bash is blocked in step planning");
    let out = adapter().translate_from_hook_response(&response, &native);
    assert_eq!(out["continue"], json!(false));
    assert_eq!(out["decision"], json!("block"));
    assert_eq!(out["reason"], json!("Bash is blocked in step planning"));
    assert!(out.get("hookSpecificOutput").is_none());
}

#[test]
fn system_message_passes_through() {
    let native = json!({"hook_event_name": "SessionStart"});
    let response = HookResponse {
        system_message: Some("daemon connected".to_string()),
        ..HookResponse::allow()
    };
    let out = adapter().translate_from_hook_response(&response, &native);
    assert_eq!(out["systemMessage"], json!("daemon connected"));
}
