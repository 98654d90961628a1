// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action executor
//!
//! Dispatch table from action name to handler. Handlers receive an
//! [`ActionContext`] and return a JSON map merged into the engine's
//! per-event response. Actions flagged `background: true` are detached:
//! the flag is stripped before dispatch, the task is tracked in the
//! process-wide set, the result is discarded, and errors surface only
//! in the log.

mod context;
mod memory;
mod orchestration;

use crate::background::BackgroundTasks;
use crate::broadcaster::Broadcaster;
use crate::llm::{LlmRequest, LlmService, ToolProxy, VectorStore};
use crate::pipeline::PipelineExecutor;
use crate::runner::AgentRunner;
use crate::state_manager::WorkflowStateManager;
use crate::EngineError;
use gobby_core::HookEvent;
use gobby_storage::{MemoryStore, SessionStore, TaskStore};
use gobby_workflow::{TemplateEngine, TriggerAction};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a handler may need for one action invocation.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub session_id: String,
    pub workflow_name: String,
    pub project_id: String,
    pub event: HookEvent,
    /// Name-resolution context for templates and conditions.
    pub eval_context: HashMap<String, Value>,
}

/// Services shared by every handler. All handles are cheap clones.
#[derive(Clone)]
pub struct ActionExecutor {
    pub(crate) sessions: SessionStore,
    pub(crate) tasks: TaskStore,
    pub(crate) memories: MemoryStore,
    pub(crate) states: WorkflowStateManager,
    pub(crate) templates: TemplateEngine,
    pub(crate) background: BackgroundTasks,
    pub(crate) broadcaster: Broadcaster,
    pub(crate) llm: Option<Arc<dyn LlmService>>,
    pub(crate) vectors: Option<Arc<dyn VectorStore>>,
    pub(crate) tool_proxy: Option<Arc<dyn ToolProxy>>,
    pub(crate) pipelines: Option<Arc<PipelineExecutor>>,
    pub(crate) runner: Option<Arc<AgentRunner>>,
    pub(crate) memory_enabled: bool,
}

/// Builder-ish constructor keeping optional seams explicit.
pub struct ActionExecutorDeps {
    pub sessions: SessionStore,
    pub tasks: TaskStore,
    pub memories: MemoryStore,
    pub states: WorkflowStateManager,
    pub broadcaster: Broadcaster,
    pub llm: Option<Arc<dyn LlmService>>,
    pub vectors: Option<Arc<dyn VectorStore>>,
    pub tool_proxy: Option<Arc<dyn ToolProxy>>,
    pub pipelines: Option<Arc<PipelineExecutor>>,
    pub runner: Option<Arc<AgentRunner>>,
    pub memory_enabled: bool,
}

impl ActionExecutor {
    pub fn new(deps: ActionExecutorDeps) -> Self {
        Self {
            sessions: deps.sessions,
            tasks: deps.tasks,
            memories: deps.memories,
            states: deps.states,
            templates: TemplateEngine::new(),
            background: BackgroundTasks::new(),
            broadcaster: deps.broadcaster,
            llm: deps.llm,
            vectors: deps.vectors,
            tool_proxy: deps.tool_proxy,
            pipelines: deps.pipelines,
            runner: deps.runner,
            memory_enabled: deps.memory_enabled,
        }
    }

    pub fn background_tasks(&self) -> &BackgroundTasks {
        &self.background
    }

    /// Execute one action. Background actions return an empty result
    /// immediately; their eventual output is discarded by contract.
    pub async fn execute(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let mut action = action.clone();
        // The background flag is a dispatch concern; handlers never see it.
        let background = action
            .params
            .remove("background")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if background {
            let executor = self.clone();
            let ctx = ctx.clone();
            let name = action.action.clone();
            self.background.spawn("workflow_action", async move {
                executor
                    .dispatch(&action, &ctx)
                    .await
                    .map(|_| ())
                    .map_err(|e| format!("{name}: {e}"))
            });
            return Ok(Map::new());
        }

        self.count_action(ctx);
        self.dispatch(&action, ctx).await
    }

    fn count_action(&self, ctx: &ActionContext) {
        let result = self.states.store().mutate(&ctx.session_id, &ctx.workflow_name, |state| {
            state.step_action_count += 1;
            state.total_action_count += 1;
            Ok(())
        });
        if let Err(e) = result {
            tracing::debug!(error = %e, "failed to bump action counters");
        }
    }

    /// The dispatch table.
    async fn dispatch(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        match action.action.as_str() {
            // Context
            "inject_context" => self.inject_context(action, ctx).await,
            "inject_message" => self.inject_message(action, ctx),
            "restore_context" => self.restore_context(action, ctx),
            "extract_handoff_context" => self.extract_handoff_context(ctx),
            // Variables and steps
            "set_variable" => self.set_variable(action, ctx),
            "increment_variable" => self.increment_variable(action, ctx),
            "transition_to" => self.transition_to(action, ctx),
            "record_observation" => self.record_observation(action, ctx),
            // Agents and orchestration
            "spawn_agent" => self.spawn_agent(action, ctx).await,
            "wait_for_task" => self.wait_for_task(action, ctx).await,
            "wait_for_any_task" => self.wait_for_tasks(action, ctx, WaitMode::Any).await,
            "wait_for_all_tasks" => self.wait_for_tasks(action, ctx, WaitMode::All).await,
            // Pipelines
            "run_pipeline" => self.run_pipeline(action, ctx).await,
            // Tasks
            "create_task" => self.create_task(action, ctx),
            "update_task" => self.update_task(action, ctx),
            "close_task" => self.close_task(action, ctx),
            // Memory
            "memory_save" => self.memory_save(action, ctx).await,
            "memory_recall_relevant" => self.memory_recall_relevant(action, ctx).await,
            "memory_inject_project_context" => self.memory_inject_project_context(ctx).await,
            "memory_extract_from_session" => self.memory_extract_from_session(ctx).await,
            "memory_review_gate" => self.memory_review_gate(ctx),
            "memory_sync_import" => self.memory_sync_import(action, ctx),
            "memory_sync_export" => self.memory_sync_export(action, ctx),
            // Misc
            "synthesize_title" => self.synthesize_title(action, ctx).await,
            "send_notification" => self.send_notification(action, ctx),
            other => {
                tracing::warn!(action = other, "unknown workflow action");
                Ok(Map::new())
            }
        }
    }

    /// Render a string parameter through the template engine.
    pub(crate) fn render_param(
        &self,
        action: &TriggerAction,
        key: &str,
        ctx: &ActionContext,
    ) -> Option<String> {
        action
            .param_str(key)
            .map(|template| self.templates.render(template, &ctx.eval_context))
    }

    // -- small handlers kept here; context/memory/orchestration have
    // their own modules --

    fn set_variable(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let name = action
            .param_str("name")
            .ok_or_else(|| EngineError::Validation("set_variable needs 'name'".to_string()))?
            .to_string();
        let value = match action.params.get("value") {
            Some(Value::String(template)) => {
                Value::String(self.templates.render(template, &ctx.eval_context))
            }
            Some(other) => other.clone(),
            None => Value::Null,
        };
        self.states.store().mutate(&ctx.session_id, &ctx.workflow_name, |state| {
            state.variables.insert(name.clone(), value.clone());
            Ok(())
        })?;
        Ok(Map::new())
    }

    fn increment_variable(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let name = action
            .param_str("name")
            .ok_or_else(|| EngineError::Validation("increment_variable needs 'name'".to_string()))?
            .to_string();
        let by = action.params.get("by").and_then(Value::as_i64).unwrap_or(1);
        self.states.store().mutate(&ctx.session_id, &ctx.workflow_name, |state| {
            let current = state.variables.get(&name).and_then(Value::as_i64).unwrap_or(0);
            state.variables.insert(name.clone(), json!(current + by));
            Ok(())
        })?;
        Ok(Map::new())
    }

    fn transition_to(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let step = action
            .param_str("step")
            .ok_or_else(|| EngineError::Validation("transition_to needs 'step'".to_string()))?;
        self.states.transition_step(&ctx.session_id, &ctx.workflow_name, step)?;
        let mut out = Map::new();
        out.insert("transitioned_to".to_string(), json!(step));
        Ok(out)
    }

    fn record_observation(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let content = self
            .render_param(action, "content", ctx)
            .ok_or_else(|| EngineError::Validation("record_observation needs 'content'".to_string()))?;
        self.states.record_observation(&ctx.session_id, &ctx.workflow_name, &content)?;
        Ok(Map::new())
    }

    fn create_task(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let title = self
            .render_param(action, "title", ctx)
            .ok_or_else(|| EngineError::Validation("create_task needs 'title'".to_string()))?;
        let task = self.tasks.create(
            &ctx.project_id,
            gobby_storage::tasks::NewTask {
                title,
                description: self.render_param(action, "description", ctx),
                parent_task_id: action.param_str("parent_task_id").map(str::to_string),
                ..Default::default()
            },
        )?;
        let mut out = Map::new();
        out.insert("task_id".to_string(), json!(task.id));
        out.insert("task_ref".to_string(), json!(task.short_ref()));
        Ok(out)
    }

    fn update_task(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let reference = action
            .param_str("task")
            .ok_or_else(|| EngineError::Validation("update_task needs 'task'".to_string()))?;
        let task = self.tasks.resolve_task_reference(reference, &ctx.project_id)?;
        if let Some(status) = action.param_str("status").and_then(gobby_core::TaskStatus::parse) {
            self.tasks.set_status(&task.id, status)?;
        }
        if let Some(sha) = action.param_str("commit") {
            self.tasks.link_commit(&task.id, sha)?;
        }
        Ok(Map::new())
    }

    fn close_task(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let reference = action
            .param_str("task")
            .ok_or_else(|| EngineError::Validation("close_task needs 'task'".to_string()))?;
        let task = self.tasks.resolve_task_reference(reference, &ctx.project_id)?;
        let closed = self.tasks.close(
            &task.id,
            gobby_storage::CloseOptions {
                no_commit_needed: action.param_bool("no_commit_needed"),
                uncommitted_tracked_changes: false,
            },
        )?;
        let mut out = Map::new();
        out.insert("closed_task".to_string(), json!(closed.short_ref()));
        Ok(out)
    }

    fn send_notification(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let message = self.render_param(action, "message", ctx).unwrap_or_default();
        self.broadcaster.broadcast_system(json!({
            "type": "notification",
            "session_id": ctx.session_id,
            "message": message,
        }));
        Ok(Map::new())
    }

    async fn synthesize_title(
        &self,
        action: &TriggerAction,
        ctx: &ActionContext,
    ) -> Result<Map<String, Value>, EngineError> {
        let llm = self.llm.as_ref().ok_or(EngineError::LlmUnavailable)?;
        let source = action.param_str("source").unwrap_or("prompt");
        let text = match source {
            "transcript" => {
                let session = self.sessions.get(&ctx.session_id)?;
                session
                    .jsonl_path
                    .as_deref()
                    .and_then(|path| std::fs::read_to_string(path).ok())
                    .unwrap_or_default()
            }
            _ => ctx.event.prompt().to_string(),
        };
        if text.is_empty() {
            return Ok(Map::new());
        }
        let request = LlmRequest {
            prompt: format!(
                "Produce a concise title (max 8 words) for this coding session:\n\n{text}"
            ),
            max_tokens: Some(64),
            ..Default::default()
        };
        let result = llm
            .complete(request)
            .await
            .map_err(|e| EngineError::Validation(format!("synthesize_title: {e}")))?;
        let title = result
            .as_str()
            .map(str::to_string)
            .or_else(|| result.get("title").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();
        if !title.is_empty() {
            self.sessions.set_title(&ctx.session_id, title.trim())?;
        }
        Ok(Map::new())
    }
}

/// Wait mode for multi-task waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitMode {
    Any,
    All,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
