// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use gobby_core::test_support::hook_event;
use gobby_core::HookEventType;
use gobby_workflow::{parse_workflow, ConditionEvaluator};
use serde_json::json;

fn instance(name: &str, step: &str) -> WorkflowInstance {
    WorkflowInstance {
        workflow_name: name.to_string(),
        enabled: true,
        current_step: step.to_string(),
        step_action_count: 0,
        total_action_count: 0,
        variables: HashMap::new(),
    }
}

fn definitions(pairs: &[(&str, &str)]) -> HashMap<String, WorkflowDefinition> {
    pairs
        .iter()
        .map(|(name, yaml)| ((*name).to_string(), parse_workflow(yaml).unwrap()))
        .collect()
}

fn before_tool(tool: &str) -> gobby_core::HookEvent {
    let mut event = hook_event(HookEventType::BeforeTool, "ext-1");
    event.data.insert("tool_name".to_string(), json!(tool));
    event
}

const GUARD: &str = r#"
name: guard
priority: 1
steps:
  - name: locked
    blocked_tools: [Bash]
"#;

const CHATTY: &str = r#"
name: chatty
priority: 5
triggers:
  on_before_tool:
    - action: inject_context
      content: "chatty says hi"
steps:
  - name: idle
"#;

#[test]
fn blocked_tool_blocks_with_step_in_reason() {
    let defs = definitions(&[("guard", GUARD)]);
    let result = evaluate_event(
        &before_tool("Bash"),
        &[instance("guard", "locked")],
        &defs,
        &HashMap::new(),
        &ConditionEvaluator::new(),
    );
    assert_eq!(result.decision, gobby_core::Decision::Block);
    let reason = result.reason.unwrap();
    assert!(reason.contains("Bash"));
    assert!(reason.contains("locked"));
    assert_eq!(result.blocked_by.as_deref(), Some("guard"));
}

#[test]
fn exempt_tools_bypass_all_restrictions() {
    let yaml = r#"
name: strict
steps:
  - name: s
    allowed_tools: []
    blocked_tools: [list_tools]
"#;
    let defs = definitions(&[("strict", yaml)]);
    for tool in ["list_tools", "mcp__gobby__list_tools", "search_tools"] {
        let result = evaluate_event(
            &before_tool(tool),
            &[instance("strict", "s")],
            &defs,
            &HashMap::new(),
            &ConditionEvaluator::new(),
        );
        assert_eq!(result.decision, gobby_core::Decision::Allow, "tool: {tool}");
    }
}

#[test]
fn whitelist_blocks_unlisted_tools() {
    let yaml = r#"
name: narrow
steps:
  - name: s
    allowed_tools: [Read]
"#;
    let defs = definitions(&[("narrow", yaml)]);
    let allow = evaluate_event(
        &before_tool("Read"),
        &[instance("narrow", "s")],
        &defs,
        &HashMap::new(),
        &ConditionEvaluator::new(),
    );
    assert_eq!(allow.decision, gobby_core::Decision::Allow);

    let block = evaluate_event(
        &before_tool("Write"),
        &[instance("narrow", "s")],
        &defs,
        &HashMap::new(),
        &ConditionEvaluator::new(),
    );
    assert_eq!(block.decision, gobby_core::Decision::Block);
    assert!(block.reason.unwrap().contains("not in allowed list"));
}

#[test]
fn rule_with_condition_blocks() {
    let yaml = r#"
name: ruled
steps:
  - name: s
    rules:
      - when: "tool_name == 'Write'"
        action: block
        message: "writes forbidden here"
"#;
    let defs = definitions(&[("ruled", yaml)]);
    let result = evaluate_event(
        &before_tool("Write"),
        &[instance("ruled", "s")],
        &defs,
        &HashMap::new(),
        &ConditionEvaluator::new(),
    );
    assert_eq!(result.reason.as_deref(), Some("writes forbidden here"));
}

#[test]
fn priority_block_suppresses_later_context() {
    // guard (priority 1) blocks; chatty (priority 5) must contribute
    // nothing.
    let defs = definitions(&[("guard", GUARD), ("chatty", CHATTY)]);
    let instances = vec![instance("guard", "locked"), instance("chatty", "idle")];
    let result = evaluate_event(
        &before_tool("Bash"),
        &instances,
        &defs,
        &HashMap::new(),
        &ConditionEvaluator::new(),
    );
    assert_eq!(result.decision, gobby_core::Decision::Block);
    assert!(result.context_parts.is_empty());
}

#[test]
fn disabled_instances_are_skipped() {
    let defs = definitions(&[("guard", GUARD)]);
    let mut inst = instance("guard", "locked");
    inst.enabled = false;
    let result = evaluate_event(
        &before_tool("Bash"),
        &[inst],
        &defs,
        &HashMap::new(),
        &ConditionEvaluator::new(),
    );
    assert_eq!(result.decision, gobby_core::Decision::Allow);
}

#[test]
fn transition_fires_and_accumulates_status_message() {
    let yaml = r#"
name: flow
variables:
  ready: true
steps:
  - name: start
    transitions:
      - to: next
        when: "variables.ready"
  - name: next
    status_message: "entering next"
"#;
    let defs = definitions(&[("flow", yaml)]);
    let event = hook_event(HookEventType::AfterTool, "ext-1");
    let result = evaluate_event(
        &event,
        &[instance("flow", "start")],
        &defs,
        &HashMap::new(),
        &ConditionEvaluator::new(),
    );
    assert_eq!(result.transitions.get("flow").map(String::as_str), Some("next"));
    assert_eq!(result.context_parts, vec!["entering next".to_string()]);
}

#[test]
fn auto_chain_follows_unconditional_transitions_without_looping() {
    let yaml = r#"
name: chain
steps:
  - name: a
    transitions:
      - to: b
  - name: b
    transitions:
      - to: c
  - name: c
    status_message: "landed"
    transitions:
      - to: a
"#;
    let defs = definitions(&[("chain", yaml)]);
    let event = hook_event(HookEventType::AfterTool, "ext-1");
    let result = evaluate_event(
        &event,
        &[instance("chain", "a")],
        &defs,
        &HashMap::new(),
        &ConditionEvaluator::new(),
    );
    // b chains to c; c's transition back to a is suppressed by the
    // visited set.
    assert_eq!(result.transitions.get("chain").map(String::as_str), Some("c"));
    assert_eq!(result.context_parts, vec!["landed".to_string()]);
}

#[test]
fn trigger_inject_context_honors_when_guard() {
    let yaml = r#"
name: guarded
variables:
  show: false
triggers:
  on_before_tool:
    - action: inject_context
      content: "hidden"
      when: "variables.show"
    - action: inject_context
      content: "visible"
steps: []
"#;
    let defs = definitions(&[("guarded", yaml)]);
    let result = evaluate_event(
        &before_tool("Read"),
        &[instance("guarded", "")],
        &defs,
        &HashMap::new(),
        &ConditionEvaluator::new(),
    );
    assert_eq!(result.context_parts, vec!["visible".to_string()]);
}

#[test]
fn session_variables_visible_in_conditions() {
    let yaml = r#"
name: sess
steps:
  - name: s
    rules:
      - when: "session.status == 'active'"
        action: block
        message: "no tools while active"
"#;
    let defs = definitions(&[("sess", yaml)]);
    let mut session_vars = HashMap::new();
    session_vars.insert("status".to_string(), json!("active"));
    let result = evaluate_event(
        &before_tool("Read"),
        &[instance("sess", "s")],
        &defs,
        &session_vars,
        &ConditionEvaluator::new(),
    );
    assert_eq!(result.decision, gobby_core::Decision::Block);
}

#[test]
fn to_hook_response_joins_parts() {
    let result = EvaluationResult {
        context_parts: vec!["one".to_string(), "two".to_string()],
        system_messages: vec!["m".to_string()],
        ..Default::default()
    };
    let response = result.to_hook_response();
    assert_eq!(response.context.as_deref(), Some("one\n\ntwo"));
    assert_eq!(response.system_message.as_deref(), Some("m"));
}
