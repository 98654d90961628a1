// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow engine
//!
//! Owns the definition loader and instance state. `evaluate` runs the
//! unified evaluator across a session's instances and persists fired
//! transitions; `run_lifecycle` routes the non-`inject_context` trigger
//! actions through the ActionExecutor, in priority order, stopping at
//! the first block.

use crate::actions::{ActionContext, ActionExecutor};
use crate::evaluator::{self, EvaluationResult, WorkflowInstance};
use crate::state_manager::WorkflowStateManager;
use crate::EngineError;
use gobby_core::{HookEvent, WorkflowState};
use gobby_workflow::{ConditionEvaluator, DefinitionLoader, WorkflowDefinition};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Variable disabling an instance without deleting its state.
const VAR_DISABLED: &str = "_disabled";

pub struct WorkflowEngine {
    loader: Arc<DefinitionLoader>,
    states: WorkflowStateManager,
    executor: Arc<ActionExecutor>,
    conditions: ConditionEvaluator,
}

impl WorkflowEngine {
    pub fn new(
        loader: Arc<DefinitionLoader>,
        states: WorkflowStateManager,
        executor: Arc<ActionExecutor>,
    ) -> Self {
        // Task-aware condition functions (task_tree_complete) resolve
        // through the executor's task store.
        let conditions = crate::conditions::evaluator(executor.tasks.clone());
        Self { loader, states, executor, conditions }
    }

    pub fn loader(&self) -> &Arc<DefinitionLoader> {
        &self.loader
    }

    pub fn states(&self) -> &WorkflowStateManager {
        &self.states
    }

    /// Attach a workflow to a session, creating instance state seeded
    /// from the definition.
    pub fn attach(&self, session_id: &str, workflow_name: &str) -> Result<WorkflowState, EngineError> {
        let definition = self
            .loader
            .get_workflow(workflow_name)
            .ok_or_else(|| EngineError::NotFound("workflow", workflow_name.to_string()))?;
        let initial_step = definition
            .first_step()
            .map(|s| s.name.as_str())
            .unwrap_or("");
        self.states
            .get_or_create(session_id, workflow_name, initial_step, &definition.variables)
    }

    /// Active instances for a session with their definitions, sorted by
    /// priority ascending (lower evaluates first).
    fn load_instances(
        &self,
        session_id: &str,
    ) -> Result<(Vec<WorkflowInstance>, HashMap<String, WorkflowDefinition>), EngineError> {
        let definitions = self.loader.workflows();
        let mut rows: Vec<(i32, WorkflowInstance)> = Vec::new();
        for state in self.states.list_for_session(session_id)? {
            let Some(definition) = definitions.get(&state.workflow_name) else {
                // Missing definition: skip, keep state for later reloads.
                continue;
            };
            let enabled = !state
                .variables
                .get(VAR_DISABLED)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            rows.push((
                definition.priority,
                WorkflowInstance {
                    workflow_name: state.workflow_name.clone(),
                    enabled,
                    current_step: state.step.clone(),
                    step_action_count: state.step_action_count,
                    total_action_count: state.total_action_count,
                    variables: state.variables.clone(),
                },
            ));
        }
        rows.sort_by_key(|(priority, _)| *priority);
        Ok((rows.into_iter().map(|(_, i)| i).collect(), definitions))
    }

    /// Evaluate one event across the session's instances; persists any
    /// fired transitions before returning.
    pub fn evaluate(
        &self,
        event: &HookEvent,
        session_id: &str,
        session_variables: &HashMap<String, Value>,
    ) -> Result<EvaluationResult, EngineError> {
        let (instances, definitions) = self.load_instances(session_id)?;
        let result = evaluator::evaluate_event(
            event,
            &instances,
            &definitions,
            session_variables,
            &self.conditions,
        );
        for (workflow_name, new_step) in &result.transitions {
            self.states.transition_step(session_id, workflow_name, new_step)?;
        }
        Ok(result)
    }

    /// Run the lifecycle pass: every trigger action other than
    /// `inject_context` goes through the ActionExecutor. Returns merged
    /// handler output; a handler-emitted `decision: block` stops further
    /// instances.
    pub async fn run_lifecycle(
        &self,
        event: &HookEvent,
        session_id: &str,
        project_id: &str,
        session_variables: &HashMap<String, Value>,
    ) -> Result<Map<String, Value>, EngineError> {
        let (instances, definitions) = self.load_instances(session_id)?;
        let mut merged = Map::new();

        for instance in &instances {
            if !instance.enabled {
                continue;
            }
            let Some(definition) = definitions.get(&instance.workflow_name) else {
                continue;
            };
            let eval_context =
                evaluator::build_eval_context(event, instance, definition, session_variables);
            let ctx = ActionContext {
                session_id: session_id.to_string(),
                workflow_name: instance.workflow_name.clone(),
                project_id: project_id.to_string(),
                event: event.clone(),
                eval_context: eval_context.clone(),
            };
            for action in definition.trigger_actions(event.event_type) {
                if action.action == "inject_context" {
                    continue;
                }
                if let Some(when) = action.param_str("when") {
                    if !when.is_empty() && !self.conditions.evaluate(when, &eval_context) {
                        continue;
                    }
                }
                match self.executor.execute(action, &ctx).await {
                    Ok(result) => {
                        merge_result(&mut merged, result);
                        if merged.get("decision").and_then(Value::as_str) == Some("block") {
                            return Ok(merged);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            workflow = %instance.workflow_name,
                            action = %action.action,
                            error = %e,
                            "lifecycle action failed"
                        );
                    }
                }
            }
        }
        Ok(merged)
    }
}

/// Merge a handler result, concatenating context channels instead of
/// overwriting them.
fn merge_result(merged: &mut Map<String, Value>, result: Map<String, Value>) {
    for (key, value) in result {
        if matches!(key.as_str(), "inject_context" | "inject_message") {
            if let (Some(Value::String(existing)), Value::String(incoming)) =
                (merged.get_mut(&key), &value)
            {
                existing.push_str("\n\n");
                existing.push_str(incoming);
                continue;
            }
        }
        merged.insert(key, value);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
