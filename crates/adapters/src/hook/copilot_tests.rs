// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn adapter() -> CopilotAdapter {
    CopilotAdapter
}

#[parameterized(
    session_start = { "sessionStart", HookEventType::SessionStart },
    prompt = { "userPromptSubmitted", HookEventType::BeforeAgent },
    pre_tool = { "preToolUse", HookEventType::BeforeTool },
    post_tool = { "postToolUse", HookEventType::AfterTool },
    error = { "errorOccurred", HookEventType::Notification },
    unknown = { "mysteryHook", HookEventType::Notification },
)]
fn hook_name_mapping(name: &str, expected: HookEventType) {
    let native = json!({"hook_type": name, "sessionId": "c1"});
    let event = adapter().translate_to_hook_event(&native).unwrap();
    assert_eq!(event.event_type, expected);
    assert_eq!(event.external_id.as_deref(), Some("c1"));
}

#[test]
fn camel_case_fields_normalize() {
    let native = json!({
        "hook_type": "preToolUse",
        "sessionId": "c1",
        "toolName": "bash",
        "toolArgs": {"command": "ls"},
    });
    let event = adapter().translate_to_hook_event(&native).unwrap();
    assert_eq!(event.tool_name(), "bash");
    assert_eq!(
        event.tool_input().and_then(|v| v.get("command")).and_then(|v| v.as_str()),
        Some("ls")
    );
}

#[test]
fn tool_result_text_becomes_output() {
    let native = json!({
        "hook_type": "postToolUse",
        "toolName": "bash",
        "toolResult": {"textResultForLlm": "done", "resultType": "success"},
    });
    let event = adapter().translate_to_hook_event(&native).unwrap();
    assert_eq!(event.data.get("tool_output"), Some(&json!("done")));
    assert!(event.data.get("is_error").is_none());
}

#[test]
fn error_result_sets_is_error() {
    let native = json!({
        "hook_type": "postToolUse",
        "toolResult": {"textResultForLlm": "boom", "resultType": "error"},
    });
    let event = adapter().translate_to_hook_event(&native).unwrap();
    assert_eq!(event.data.get("is_error"), Some(&json!(true)));
}

#[test]
fn pre_tool_response_uses_permission_decision() {
    let native = json!({"hook_type": "preToolUse"});
    let out = adapter().translate_from_hook_response(&HookResponse::allow(), &native);
    assert_eq!(out["permissionDecision"], json!("allow"));

    let out = adapter().translate_from_hook_response(&HookResponse::block("no"), &native);
    assert_eq!(out["permissionDecision"], json!("deny"));
    assert_eq!(out["permissionDecisionReason"], json!("no"));
}

#[test]
fn context_injected_with_pascal_case_event_name() {
    let native = json!({"hook_type": "userPromptSubmitted"});
    let response = HookResponse {
        context: Some("ctx".to_string()),
        ..HookResponse::allow()
    };
    let out = adapter().translate_from_hook_response(&response, &native);
    assert_eq!(out["hookSpecificOutput"]["hookEventName"], json!("UserPromptSubmitted"));
    assert_eq!(out["hookSpecificOutput"]["additionalContext"], json!("ctx"));
}

#[test]
fn context_suppressed_on_block() {
    let native = json!({"hook_type": "preToolUse"});
    let response = HookResponse {
        context: Some("ctx".to_string()),
        ..HookResponse::block("denied")
    };
    let out = adapter().translate_from_hook_response(&response, &native);
    assert!(out.get("hookSpecificOutput").is_none());
}
