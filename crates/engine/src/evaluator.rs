// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified workflow evaluation
//!
//! Evaluates one hook event across every active workflow instance of a
//! session, in priority order. Tool restrictions short-circuit on the
//! first block; step transitions follow the auto-chain up to a fixed
//! depth with a visited set; triggers contribute injected context.

use gobby_core::{Decision, HookEvent, HookEventType, HookResponse};
use gobby_workflow::{
    tool_name_matches, ConditionEvaluator, StepTransition, ToolList, WorkflowDefinition,
    WorkflowStep,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

/// Read-only MCP discovery tools always allowed regardless of workflow
/// restrictions.
pub const EXEMPT_TOOLS: &[&str] = &[
    "list_mcp_servers",
    "mcp__gobby__list_mcp_servers",
    "list_tools",
    "mcp__gobby__list_tools",
    "get_tool_schema",
    "mcp__gobby__get_tool_schema",
    "recommend_tools",
    "mcp__gobby__recommend_tools",
    "search_tools",
    "mcp__gobby__search_tools",
];

/// Maximum auto-transition chain depth to prevent loops.
const MAX_CHAIN_DEPTH: usize = 10;

/// A live workflow instance attached to a session.
#[derive(Debug, Clone)]
pub struct WorkflowInstance {
    pub workflow_name: String,
    pub enabled: bool,
    pub current_step: String,
    pub step_action_count: u64,
    pub total_action_count: u64,
    pub variables: HashMap<String, Value>,
}

/// Result of evaluating one event across all instances.
#[derive(Debug, Clone, Default)]
pub struct EvaluationResult {
    pub decision: Decision,
    pub context_parts: Vec<String>,
    pub system_messages: Vec<String>,
    pub reason: Option<String>,
    pub blocked_by: Option<String>,
    /// workflow_name → new step, for instances whose transitions fired.
    pub transitions: HashMap<String, String>,
}

impl EvaluationResult {
    pub fn to_hook_response(&self) -> HookResponse {
        HookResponse {
            decision: self.decision,
            reason: self.reason.clone(),
            context: if self.context_parts.is_empty() {
                None
            } else {
                Some(self.context_parts.join("\n\n"))
            },
            system_message: if self.system_messages.is_empty() {
                None
            } else {
                Some(self.system_messages.join("\n"))
            },
            metadata: Default::default(),
        }
    }
}

/// Evaluate an event across active instances (pre-sorted by priority
/// ascending). Stops at the first block.
pub fn evaluate_event(
    event: &HookEvent,
    instances: &[WorkflowInstance],
    definitions: &HashMap<String, WorkflowDefinition>,
    session_variables: &HashMap<String, Value>,
    evaluator: &ConditionEvaluator,
) -> EvaluationResult {
    let mut result = EvaluationResult::default();

    for instance in instances {
        if !instance.enabled {
            continue;
        }
        let Some(definition) = definitions.get(&instance.workflow_name) else {
            continue;
        };

        let eval_ctx = build_eval_context(event, instance, definition, session_variables);

        // Tool restrictions only gate BEFORE_TOOL.
        if event.event_type == HookEventType::BeforeTool {
            if let Some(step) = definition.get_step(&instance.current_step) {
                if let Some(reason) =
                    evaluate_step_tool_rules(event.tool_name(), step, &eval_ctx, evaluator)
                {
                    result.decision = Decision::Block;
                    result.reason = Some(reason);
                    result.blocked_by = Some(instance.workflow_name.clone());
                    return result;
                }
            }
        }

        // Step transitions, following the auto-chain.
        if let Some(step) = definition.get_step(&instance.current_step) {
            if let Some(first_target) = evaluate_step_transitions(step, &eval_ctx, evaluator) {
                let mut visited: HashSet<String> = HashSet::new();
                visited.insert(instance.current_step.clone());
                visited.insert(first_target.clone());
                let mut target = first_target;
                let mut depth = 0;
                while depth < MAX_CHAIN_DEPTH {
                    let Some(next_def) = definition.get_step(&target) else {
                        break;
                    };
                    match evaluate_step_transitions(next_def, &eval_ctx, evaluator) {
                        Some(chained) if !visited.contains(&chained) => {
                            visited.insert(chained.clone());
                            target = chained;
                            depth += 1;
                        }
                        _ => break,
                    }
                }
                if let Some(target_step) = definition.get_step(&target) {
                    if let Some(message) = &target_step.status_message {
                        result.context_parts.push(message.clone());
                    }
                }
                result.transitions.insert(instance.workflow_name.clone(), target);
            }
        }

        // Trigger-driven context injection.
        result
            .context_parts
            .extend(evaluate_triggers(event, definition, &eval_ctx, evaluator));
    }

    result
}

/// Precedence: exempt > blocked > allowed-whitelist > rules. Returns the
/// block reason, or None to allow.
fn evaluate_step_tool_rules(
    tool_name: &str,
    step: &WorkflowStep,
    eval_ctx: &HashMap<String, Value>,
    evaluator: &ConditionEvaluator,
) -> Option<String> {
    if EXEMPT_TOOLS.iter().any(|t| tool_name_matches(t, tool_name)) {
        return None;
    }
    if step.blocked_tools.iter().any(|t| tool_name_matches(t, tool_name)) {
        return Some(format!("Tool '{tool_name}' is blocked in step '{}'.", step.name));
    }
    if step.allowed_tools != ToolList::All && !step.allowed_tools.permits(tool_name) {
        return Some(format!(
            "Tool '{tool_name}' is not in allowed list for step '{}'.",
            step.name
        ));
    }
    for rule in &step.rules {
        if rule.action == "block" && !rule.when.is_empty() && evaluator.evaluate(&rule.when, eval_ctx)
        {
            return Some(
                rule.message
                    .clone()
                    .unwrap_or_else(|| format!("Blocked by rule in step '{}'", step.name)),
            );
        }
    }
    None
}

/// First transition whose condition matches; an empty condition always
/// fires.
fn evaluate_step_transitions(
    step: &WorkflowStep,
    eval_ctx: &HashMap<String, Value>,
    evaluator: &ConditionEvaluator,
) -> Option<String> {
    step.transitions.iter().find_map(|StepTransition { to, when }| {
        if when.is_empty() || evaluator.evaluate(when, eval_ctx) {
            Some(to.clone())
        } else {
            None
        }
    })
}

/// Context contributed by the definition's triggers for this event type.
///
/// Only `inject_context` is processed here; other trigger actions run
/// through the ActionExecutor on the lifecycle path.
fn evaluate_triggers(
    event: &HookEvent,
    definition: &WorkflowDefinition,
    eval_ctx: &HashMap<String, Value>,
    evaluator: &ConditionEvaluator,
) -> Vec<String> {
    let mut parts = Vec::new();
    for action in definition.trigger_actions(event.event_type) {
        if action.action != "inject_context" {
            continue;
        }
        if let Some(when) = action.param_str("when") {
            if !when.is_empty() && !evaluator.evaluate(when, eval_ctx) {
                continue;
            }
        }
        if let Some(content) = action.param_str("content") {
            if !content.is_empty() {
                parts.push(content.to_string());
            }
        }
    }
    parts
}

/// Build the name-resolution context for conditions and templates.
///
/// Workflow variables (definition defaults merged with instance
/// overrides) appear both under `variables.*` and flattened at top
/// level; session variables under `session.*`.
pub fn build_eval_context(
    event: &HookEvent,
    instance: &WorkflowInstance,
    definition: &WorkflowDefinition,
    session_variables: &HashMap<String, Value>,
) -> HashMap<String, Value> {
    let mut workflow_vars = definition.variables.clone();
    for (key, value) in &instance.variables {
        workflow_vars.insert(key.clone(), value.clone());
    }

    let mut ctx: HashMap<String, Value> = HashMap::new();
    ctx.insert(
        "variables".to_string(),
        Value::Object(workflow_vars.clone().into_iter().collect()),
    );
    ctx.insert(
        "session".to_string(),
        Value::Object(session_variables.clone().into_iter().collect()),
    );
    ctx.insert("step".to_string(), json!(instance.current_step));
    ctx.insert("step_action_count".to_string(), json!(instance.step_action_count));
    ctx.insert("total_action_count".to_string(), json!(instance.total_action_count));
    ctx.insert(
        "tool_name".to_string(),
        event.data.get("tool_name").cloned().unwrap_or(Value::Null),
    );
    ctx.insert(
        "tool_args".to_string(),
        event.data.get("tool_input").cloned().unwrap_or_else(|| json!({})),
    );
    ctx.insert("event_type".to_string(), json!(event.event_type.as_str()));
    ctx.insert("workflow_name".to_string(), json!(instance.workflow_name));

    // Flatten workflow variables to the top level for convenience.
    for (key, value) in workflow_vars {
        ctx.insert(key, value);
    }
    ctx
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
