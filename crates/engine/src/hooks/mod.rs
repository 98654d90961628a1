// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook manager
//!
//! The single entry point for unified hook events: resolve the session,
//! run the per-event handlers, evaluate workflows, fire webhooks,
//! broadcast, and compose the response. Handling is serialized per
//! session so a second event cannot enter the workflow engine while the
//! first is still dispatching actions for the same session.

mod handlers;

use crate::actions::ActionExecutor;
use crate::broadcaster::Broadcaster;
use crate::engine::WorkflowEngine;
use crate::webhooks::{HookWebhook, WebhookClient};
use async_trait::async_trait;
use gobby_core::{Decision, HookEvent, HookResponse, Session};
use gobby_storage::sessions::RegisterSession;
use gobby_storage::{ProjectStore, PromptStore, SessionStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tunables for the default event handlers.
#[derive(Debug, Clone)]
pub struct EventHandlerConfig {
    /// Attempts when polling for a handoff-ready parent (1s apart).
    pub find_parent_attempts: u32,
    /// Skill-suggestion score threshold.
    pub suggestion_threshold: f64,
    /// Repo root used when an event carries no cwd.
    pub default_project_root: PathBuf,
}

impl Default for EventHandlerConfig {
    fn default() -> Self {
        Self {
            find_parent_attempts: 3,
            suggestion_threshold: 0.7,
            default_project_root: PathBuf::from("."),
        }
    }
}

pub struct HookManager {
    pub(crate) sessions: SessionStore,
    pub(crate) projects: ProjectStore,
    pub(crate) prompts: PromptStore,
    pub(crate) engine: Arc<WorkflowEngine>,
    pub(crate) executor: Arc<ActionExecutor>,
    pub(crate) broadcaster: Broadcaster,
    webhook_client: WebhookClient,
    hook_webhooks: Vec<HookWebhook>,
    pub(crate) config: EventHandlerConfig,
    /// Per-session serialization: one async mutex per platform session.
    session_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl HookManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: SessionStore,
        projects: ProjectStore,
        prompts: PromptStore,
        engine: Arc<WorkflowEngine>,
        executor: Arc<ActionExecutor>,
        broadcaster: Broadcaster,
        hook_webhooks: Vec<HookWebhook>,
        config: EventHandlerConfig,
    ) -> Self {
        Self {
            sessions,
            projects,
            prompts,
            engine,
            executor,
            broadcaster,
            webhook_client: WebhookClient::new(),
            hook_webhooks,
            config,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    /// Handle one unified event end to end.
    pub async fn handle(&self, mut event: HookEvent) -> HookResponse {
        // 1. Resolve or register the session.
        let (session, first_hook) = match self.resolve_session(&event) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(error = %e, "session resolution failed; allowing");
                return HookResponse::allow();
            }
        };
        event
            .metadata
            .insert("_platform_session_id".to_string(), json!(session.id.clone()));

        let lock = self.session_lock(&session.id);
        let _guard = lock.lock().await;

        let mut response = HookResponse::allow();
        response.metadata.session_id = Some(session.id.clone());
        response.metadata.external_id = Some(session.external_id.clone());
        response.metadata.machine_id = Some(session.machine_id.clone());
        response.metadata.project_id = Some(session.project_id.clone());
        response.metadata.parent_session_id = session.parent_session_id.clone();
        response.metadata.first_hook_for_session = first_hook;

        // 2. Default per-event semantics (status machine, skill
        // interception, handoff linking).
        self.run_event_handlers(&event, &session, first_hook, &mut response).await;

        // 3. Workflow engine: evaluation pass, then lifecycle actions.
        if !response.decision.is_block() {
            self.run_workflows(&event, &session, &mut response).await;
        }

        // 4. Hook webhooks; a can_block endpoint can override an allow.
        if !response.decision.is_block() {
            self.run_webhooks(&event, &mut response).await;
        }

        // 5. Broadcast (best effort, never affects the decision).
        self.broadcaster.broadcast_hook_event(&event, Some(&response));

        // 6. Composed response back to the adapter.
        response
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.session_locks.lock();
        // Opportunistic pruning keeps the map bounded.
        if locks.len() > 1024 {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    fn resolve_session(&self, event: &HookEvent) -> Result<(Session, bool), crate::EngineError> {
        let external_id = event
            .external_id
            .clone()
            .unwrap_or_else(|| format!("anon-{}", gobby_core::new_uuid()));

        let repo_root = event
            .data
            .get("cwd")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.config.default_project_root.clone());
        let name = repo_root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("default")
            .to_string();
        let project = self.projects.ensure(Path::new(&repo_root), &name)?;

        let existing = self
            .sessions
            .get_by_identity(&external_id, &event.machine_id, event.source)?;
        let first_hook = existing.is_none();

        let session = self.sessions.register(
            &external_id,
            &event.machine_id,
            event.source,
            &project.id,
            RegisterSession {
                jsonl_path: event
                    .data
                    .get("transcript_path")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                ..Default::default()
            },
        )?;
        Ok((session, first_hook))
    }

    async fn run_workflows(
        &self,
        event: &HookEvent,
        session: &Session,
        response: &mut HookResponse,
    ) {
        let session_variables = session_variables(session);

        match self.engine.evaluate(event, &session.id, &session_variables) {
            Ok(result) => {
                if result.decision.is_block() {
                    response.decision = Decision::Block;
                    response.reason = result.reason.clone();
                    if let Some(workflow) = &result.blocked_by {
                        tracing::info!(workflow, "tool blocked by workflow");
                    }
                    return;
                }
                for part in &result.context_parts {
                    response.push_context(part);
                }
                if !result.system_messages.is_empty() {
                    response.system_message = Some(result.system_messages.join("\n"));
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "workflow evaluation failed; allowing");
            }
        }

        match self
            .engine
            .run_lifecycle(event, &session.id, &session.project_id, &session_variables)
            .await
        {
            Ok(result) => {
                if result.get("decision").and_then(Value::as_str) == Some("block") {
                    response.decision = Decision::Block;
                    response.reason = result
                        .get("reason")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    return;
                }
                if let Some(Value::String(context)) = result.get("inject_context") {
                    response.push_context(context);
                }
                if let Some(Value::String(message)) = result.get("inject_message") {
                    response.system_message = Some(match response.system_message.take() {
                        Some(existing) => format!("{existing}\n{message}"),
                        None => message.clone(),
                    });
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "lifecycle pass failed; allowing");
            }
        }
    }

    async fn run_webhooks(&self, event: &HookEvent, response: &mut HookResponse) {
        let endpoints: Vec<_> = self
            .hook_webhooks
            .iter()
            .filter(|w| w.wants(event.event_type))
            .map(|w| w.endpoint.clone())
            .collect();
        if endpoints.is_empty() {
            return;
        }
        let payload = json!({
            "event_type": event.event_type.as_str(),
            "source": event.source.as_str(),
            "external_id": event.external_id,
            "data": event.data,
        });
        if let Some((_, reason)) = self.webhook_client.deliver_all(&endpoints, &payload).await {
            response.decision = Decision::Block;
            response.reason = reason.or_else(|| Some("blocked by webhook".to_string()));
        }
    }
}

/// Session-scoped variables exposed to conditions as `session.*`.
fn session_variables(session: &Session) -> HashMap<String, Value> {
    let mut vars = HashMap::new();
    vars.insert("id".to_string(), json!(session.id));
    vars.insert("status".to_string(), json!(session.status.as_str()));
    vars.insert("source".to_string(), json!(session.source.as_str()));
    vars.insert("agent_depth".to_string(), json!(session.agent_depth));
    vars.insert("title".to_string(), json!(session.title));
    vars.insert("git_branch".to_string(), json!(session.git_branch));
    vars
}

/// Adapter-facing seam: the daemon hands this to the adapter registry.
#[async_trait]
impl gobby_adapters::HookHandler for HookManager {
    async fn handle(&self, event: HookEvent) -> HookResponse {
        HookManager::handle(self, event).await
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
