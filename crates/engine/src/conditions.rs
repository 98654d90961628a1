// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine condition built-ins
//!
//! The base [`ConditionEvaluator`] only knows data-shape functions like
//! `len`; the task-aware allowlist is registered here, where the task
//! store is available. Every production evaluator (workflow engine and
//! pipeline executor) is built through [`evaluator`] so workflow YAML
//! can gate rules and transitions on `task_tree_complete(...)`.

use gobby_storage::TaskStore;
use gobby_workflow::{ConditionEvaluator, EvalError};
use serde_json::Value;

/// The production evaluator: base allowlist plus task functions.
pub fn evaluator(tasks: TaskStore) -> ConditionEvaluator {
    let mut evaluator = ConditionEvaluator::new();
    evaluator.register("task_tree_complete", move |args: &[Value]| {
        let reference = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| {
                EvalError::Type("task_tree_complete() needs a task reference".to_string())
            })?;
        // `#N` and dotted references need a project scope; UUIDs (the
        // form orchestration variables carry) resolve without one.
        let project_id = args.get(1).and_then(Value::as_str).unwrap_or("");
        let task = tasks
            .resolve_task_reference(reference, project_id)
            .map_err(|e| EvalError::Type(format!("task_tree_complete: {e}")))?;
        Ok(Value::Bool(subtree_complete(&tasks, &task.id)?))
    });
    evaluator
}

/// True iff every descendant of `task_id` has reached a terminal
/// status. A task with no children is vacuously complete, which lets an
/// orchestrator hold its own task open while the gate watches the
/// children it spawned.
fn subtree_complete(tasks: &TaskStore, task_id: &str) -> Result<bool, EvalError> {
    let children = tasks
        .children(task_id)
        .map_err(|e| EvalError::Type(format!("task_tree_complete: {e}")))?;
    for child in children {
        if !child.status.is_terminal() {
            return Ok(false);
        }
        if !subtree_complete(tasks, &child.id)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
#[path = "conditions_tests.rs"]
mod tests;
