// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state
//!
//! One struct composing every long-lived service, built once at startup
//! and passed into the HTTP and WebSocket layers. There is no implicit
//! global anywhere; the registry and broadcaster live here.

use crate::ws::chat::ChatSessions;
use gobby_adapters::{AdapterRegistry, SessionAdapter};
use gobby_engine::{
    AgentRunner, Broadcaster, HookManager, LlmService, PipelineExecutor, RunningAgentRegistry,
    ToolProxy,
};
use gobby_storage::{
    AgentStore, CronStore, MemoryStore, PipelineStore, ProjectStore, PromptStore, SessionStore,
    TaskStore,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub adapters: AdapterRegistry,
    pub hooks: Arc<HookManager>,
    pub sessions: SessionStore,
    pub tasks: TaskStore,
    pub memories: MemoryStore,
    pub projects: ProjectStore,
    pub prompts: PromptStore,
    pub agent_history: AgentStore,
    pub crons: CronStore,
    pub pipeline_store: PipelineStore,
    pub registry: Arc<RunningAgentRegistry>,
    pub runner: Arc<AgentRunner>,
    pub pipelines: Arc<PipelineExecutor>,
    pub broadcaster: Broadcaster,
    pub tool_proxy: Option<Arc<dyn ToolProxy>>,
    pub llm: Option<Arc<dyn LlmService>>,
    pub terminal: Arc<dyn SessionAdapter>,
    pub chats: ChatSessions,
    /// Optional bearer token; `None` accepts everything (local-first).
    pub auth_token: Option<String>,
    /// Idle timeout for WebSocket chat sessions, seconds.
    pub chat_idle_timeout_seconds: u64,
    pub start_time: std::time::Instant,
}
