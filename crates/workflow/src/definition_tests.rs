// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const SAMPLE: &str = r#"
name: plan-then-build
description: Planning gate before edits
priority: 10
variables:
  plan_ready: false
triggers:
  on_session_start:
    - action: inject_context
      content: "Plan first."
steps:
  - name: planning
    allowed_tools: [Read, Grep]
    blocked_tools: [Bash]
    rules:
      - when: "tool_name == 'Write'"
        action: block
        message: "No writes during planning."
    transitions:
      - to: building
        when: "variables.plan_ready"
  - name: building
    allowed_tools: all
    status_message: "Build phase entered."
"#;

#[test]
fn parses_full_definition() {
    let def = parse_workflow(SAMPLE).unwrap();
    assert_eq!(def.name, "plan-then-build");
    assert_eq!(def.priority, 10);
    assert_eq!(def.steps.len(), 2);
    let planning = def.get_step("planning").unwrap();
    assert_eq!(planning.blocked_tools, vec!["Bash"]);
    assert_eq!(planning.rules.len(), 1);
    assert_eq!(planning.transitions[0].to, "building");
    let building = def.get_step("building").unwrap();
    assert_eq!(building.allowed_tools, ToolList::All);
    assert_eq!(building.status_message.as_deref(), Some("Build phase entered."));
}

#[test]
fn trigger_actions_resolve_by_event_type() {
    let def = parse_workflow(SAMPLE).unwrap();
    let actions = def.trigger_actions(gobby_core::HookEventType::SessionStart);
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, "inject_context");
    assert_eq!(actions[0].param_str("content"), Some("Plan first."));
    assert!(def.trigger_actions(gobby_core::HookEventType::Stop).is_empty());
}

#[test]
fn notification_has_no_trigger_key() {
    assert_eq!(trigger_key(gobby_core::HookEventType::Notification), None);
    assert_eq!(trigger_key(gobby_core::HookEventType::SubagentStart), None);
    assert_eq!(
        trigger_key(gobby_core::HookEventType::BeforeTool),
        Some("on_before_tool")
    );
}

#[test]
fn rejects_missing_name() {
    let err = parse_workflow("description: no name").unwrap_err();
    assert!(err.to_string().contains("name"));
}

#[test]
fn rejects_duplicate_steps() {
    let yaml = r#"
name: dupe
steps:
  - name: a
  - name: a
"#;
    assert!(parse_workflow(yaml).is_err());
}

#[test]
fn rejects_transition_to_unknown_step() {
    let yaml = r#"
name: dangling
steps:
  - name: a
    transitions:
      - to: missing
"#;
    let err = parse_workflow(yaml).unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[test]
fn allowed_tools_string_all() {
    let yaml = r#"
name: w
steps:
  - name: s
    allowed_tools: all
"#;
    let def = parse_workflow(yaml).unwrap();
    assert_eq!(def.steps[0].allowed_tools, ToolList::All);
}

#[parameterized(
    exact = { "Bash", "Bash", true },
    different = { "Bash", "Write", false },
    prefixed_tool = { "list_tools", "mcp__gobby__list_tools", true },
    prefixed_pattern = { "mcp__gobby__list_tools", "list_tools", true },
    both_prefixed = { "mcp__gobby__list_tools", "mcp__other__list_tools", true },
)]
fn tool_matching(pattern: &str, tool: &str, expected: bool) {
    assert_eq!(tool_name_matches(pattern, tool), expected);
}

#[test]
fn tool_list_permits() {
    let list = ToolList::Named(vec!["Read".to_string(), "list_tools".to_string()]);
    assert!(list.permits("Read"));
    assert!(list.permits("mcp__gobby__list_tools"));
    assert!(!list.permits("Bash"));
    assert!(ToolList::All.permits("anything"));
}
