// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration handlers: agent spawning, task waits, pipelines

use super::{ActionContext, ActionExecutor, WaitMode};
use crate::runner::SpawnRequest;
use crate::state_manager::OrchestrationUpdate;
use crate::EngineError;
use gobby_core::workflow_state::VAR_PENDING_PIPELINE;
use gobby_core::{AgentMode, IsolationMode, TaskStatus};
use gobby_workflow::TriggerAction;
use serde_json::{json, Map, Value};
use std::time::Duration;

const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

impl ActionExecutor {
    /// `spawn_agent{agent, task?, prompt?, workflow?, mode?, isolation?}`
    ///
    /// When the instance declares `max_concurrent`, a slot is reserved
    /// before the spawn and released after (the spawned agent then
    /// occupies `spawned_agents` instead). A failed spawn releases the
    /// slot.
    pub(super) async fn spawn_agent(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let runner = self
            .runner
            .as_ref()
            .ok_or_else(|| EngineError::Validation("agent runner not configured".to_string()))?;
        let agent = action
            .param_str("agent")
            .ok_or_else(|| EngineError::Validation("spawn_agent needs 'agent'".to_string()))?;

        let max_concurrent = ctx
            .eval_context
            .get("max_concurrent")
            .and_then(Value::as_u64);
        let mut reserved = 0;
        if let Some(cap) = max_concurrent {
            reserved = self.states.check_and_reserve_slots(
                &ctx.session_id,
                &ctx.workflow_name,
                cap,
                1,
            )?;
            if reserved == 0 {
                let mut out = Map::new();
                out.insert("spawned".to_string(), json!(false));
                out.insert("reason".to_string(), json!("no free agent slots"));
                return Ok(out);
            }
        }

        let request = SpawnRequest {
            agent: agent.to_string(),
            task: action.param_str("task").map(str::to_string),
            prompt: self.render_param(action, "prompt", ctx),
            workflow: action.param_str("workflow").map(str::to_string),
            parent_session_id: ctx.session_id.clone(),
            mode: action.param_str("mode").and_then(AgentMode::parse),
            provider: action.param_str("provider").map(str::to_string),
            terminal: action.param_str("terminal").map(str::to_string),
            isolation: action.param_str("isolation").and_then(IsolationMode::parse),
        };

        match runner.spawn(request).await {
            Ok(result) => {
                self.states.update_orchestration_lists(
                    &ctx.session_id,
                    &ctx.workflow_name,
                    OrchestrationUpdate {
                        append_to_spawned: vec![result.run_id.to_string()],
                        ..Default::default()
                    },
                )?;
                if reserved > 0 {
                    self.states.release_reserved_slots(
                        &ctx.session_id,
                        &ctx.workflow_name,
                        reserved,
                    )?;
                }
                let mut out = Map::new();
                out.insert("spawned".to_string(), json!(true));
                out.insert("run_id".to_string(), json!(result.run_id.to_string()));
                out.insert("agent_session_id".to_string(), json!(result.session_id));
                Ok(out)
            }
            Err(e) => {
                if reserved > 0 {
                    self.states.release_reserved_slots(
                        &ctx.session_id,
                        &ctx.workflow_name,
                        reserved,
                    )?;
                }
                Err(e)
            }
        }
    }

    /// `wait_for_task{task, timeout?, poll_interval?}` — poll until the
    /// task closes. A timeout yields `completed: false, timed_out: true`,
    /// never an error.
    pub(super) async fn wait_for_task(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let reference = action
            .param_str("task")
            .ok_or_else(|| EngineError::Validation("wait_for_task needs 'task'".to_string()))?;
        let task = self.tasks.resolve_task_reference(reference, &ctx.project_id)?;
        let timeout = wait_timeout(action);
        let poll = poll_interval(action);

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let current = self.tasks.get(&task.id)?;
            if current.status == TaskStatus::Closed {
                let mut out = Map::new();
                out.insert("completed".to_string(), json!(true));
                out.insert("task_id".to_string(), json!(task.id));
                return Ok(out);
            }
            if tokio::time::Instant::now() >= deadline {
                let mut out = Map::new();
                out.insert("completed".to_string(), json!(false));
                out.insert("timed_out".to_string(), json!(true));
                return Ok(out);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// `wait_for_any_task` / `wait_for_all_tasks` over `tasks: [...]`.
    pub(super) async fn wait_for_tasks(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
        mode: WaitMode,
    ) -> Result<Map<String, Value>, EngineError> {
        let references: Vec<String> = action
            .params
            .get("tasks")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if references.is_empty() {
            return Err(EngineError::Validation("wait needs non-empty 'tasks'".to_string()));
        }
        let mut ids = Vec::with_capacity(references.len());
        for reference in &references {
            ids.push(self.tasks.resolve_task_reference(reference, &ctx.project_id)?.id);
        }
        let timeout = wait_timeout(action);
        let poll = poll_interval(action);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let mut closed = Vec::new();
            for id in &ids {
                if self.tasks.get(id)?.status == TaskStatus::Closed {
                    closed.push(id.clone());
                }
            }
            let done = match mode {
                WaitMode::Any => !closed.is_empty(),
                WaitMode::All => closed.len() == ids.len(),
            };
            if done {
                let mut out = Map::new();
                out.insert("completed".to_string(), json!(true));
                out.insert("closed_tasks".to_string(), json!(closed));
                return Ok(out);
            }
            if tokio::time::Instant::now() >= deadline {
                let mut out = Map::new();
                out.insert("completed".to_string(), json!(false));
                out.insert("timed_out".to_string(), json!(true));
                out.insert("closed_tasks".to_string(), json!(closed));
                return Ok(out);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// `run_pipeline{name, inputs?, await_completion?}`
    pub(super) async fn run_pipeline(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let pipelines = self
            .pipelines
            .as_ref()
            .ok_or_else(|| EngineError::Validation("pipeline executor not configured".to_string()))?;
        let name = action
            .param_str("name")
            .ok_or_else(|| EngineError::Validation("run_pipeline needs 'name'".to_string()))?
            .to_string();
        let inputs: Map<String, Value> = match action.params.get("inputs") {
            Some(value) => {
                let rendered = self.templates.render_value(value, &ctx.eval_context);
                rendered.as_object().cloned().unwrap_or_default()
            }
            None => Map::new(),
        };
        let await_completion = action
            .params
            .get("await_completion")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        if !await_completion {
            let pipelines = std::sync::Arc::clone(pipelines);
            let project_id = ctx.project_id.clone();
            let session_id = ctx.session_id.clone();
            self.background.spawn("run_pipeline", async move {
                pipelines
                    .run(&name, inputs, Some(&project_id), Some(&session_id))
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            });
            return Ok(Map::new());
        }

        match pipelines
            .run(&name, inputs, Some(&ctx.project_id), Some(&ctx.session_id))
            .await
        {
            Ok(execution) => {
                let mut out = Map::new();
                out.insert("pipeline_status".to_string(), json!(execution.status.as_str()));
                out.insert("execution_id".to_string(), json!(execution.id.to_string()));
                if let Some(outputs) = execution
                    .outputs_json
                    .as_deref()
                    .and_then(|text| serde_json::from_str::<Value>(text).ok())
                {
                    out.insert("pipeline_outputs".to_string(), outputs);
                }
                Ok(out)
            }
            Err(EngineError::ApprovalRequired { execution_id, step_id, token, message }) => {
                // The workflow remembers the pending pipeline; the
                // approval token is the resume handle.
                self.states.store().mutate(&ctx.session_id, &ctx.workflow_name, |state| {
                    state.variables.insert(
                        VAR_PENDING_PIPELINE.to_string(),
                        json!({
                            "execution_id": execution_id.to_string(),
                            "step_id": step_id.clone(),
                            "token": token.clone(),
                        }),
                    );
                    Ok(())
                })?;
                let mut out = Map::new();
                out.insert("pipeline_status".to_string(), json!("waiting_approval"));
                out.insert("execution_id".to_string(), json!(execution_id.to_string()));
                out.insert("token".to_string(), json!(token));
                if let Some(message) = message {
                    out.insert("approval_message".to_string(), json!(message));
                }
                Ok(out)
            }
            Err(e) => Err(e),
        }
    }
}

fn wait_timeout(action: &TriggerAction) -> Duration {
    action
        .params
        .get("timeout")
        .and_then(Value::as_u64)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_WAIT_TIMEOUT)
}

fn poll_interval(action: &TriggerAction) -> Duration {
    action
        .params
        .get("poll_interval")
        .and_then(Value::as_u64)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_POLL_INTERVAL)
}
