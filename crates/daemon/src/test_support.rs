// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test fixtures for the daemon crate

use crate::state::AppState;
use crate::ws::chat::ChatSessions;
use gobby_adapters::{AdapterRegistry, FakeSessionAdapter, SessionAdapter};
use gobby_engine::actions::{ActionExecutor, ActionExecutorDeps};
use gobby_engine::llm::fakes::FakeLlm;
use gobby_engine::{
    AgentRunner, Broadcaster, EventHandlerConfig, HookManager, LlmService, PipelineExecutor,
    RunnerConfig, RunningAgentRegistry, WorkflowEngine, WorkflowStateManager,
};
use gobby_storage::{
    AgentStore, CronStore, Database, MemoryStore, PipelineStore, ProjectStore, PromptStore,
    SessionStore, TaskStore, WorkflowStateStore, WorktreeStore,
};
use gobby_workflow::{DefinitionLoader, LoaderDirs};
use std::sync::Arc;

pub struct TestDaemon {
    pub state: AppState,
    pub llm: Arc<FakeLlm>,
    pub terminal: Arc<FakeSessionAdapter>,
    pub loader: Arc<DefinitionLoader>,
    pub pipeline_dir: tempfile::TempDir,
    pub workdir: tempfile::TempDir,
}

impl TestDaemon {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let workdir = tempfile::tempdir().unwrap();
        let pipeline_dir = tempfile::tempdir().unwrap();
        let workflow_dir = workdir.path().join("workflows");
        std::fs::create_dir_all(&workflow_dir).unwrap();

        let sessions = SessionStore::new(Arc::clone(&db));
        let tasks = TaskStore::new(Arc::clone(&db));
        let memories = MemoryStore::new(Arc::clone(&db));
        let projects = ProjectStore::new(Arc::clone(&db));
        let prompts = PromptStore::new(Arc::clone(&db));
        let crons = CronStore::new(Arc::clone(&db));
        let agent_history = AgentStore::new(Arc::clone(&db));
        let pipeline_store = PipelineStore::new(Arc::clone(&db));
        let states = WorkflowStateManager::new(WorkflowStateStore::new(Arc::clone(&db)));

        let loader = Arc::new(DefinitionLoader::new(
            LoaderDirs { project: Some(workflow_dir), ..Default::default() },
            LoaderDirs {
                project: Some(pipeline_dir.path().to_path_buf()),
                ..Default::default()
            },
        ));

        let llm = Arc::new(FakeLlm::default());
        let registry = Arc::new(RunningAgentRegistry::new());
        let broadcaster = Broadcaster::default();
        let terminal = Arc::new(FakeSessionAdapter::new());

        let runner = Arc::new(AgentRunner::new(
            sessions.clone(),
            projects.clone(),
            WorktreeStore::new(Arc::clone(&db)),
            agent_history.clone(),
            Arc::clone(&registry),
            Arc::clone(&terminal) as Arc<dyn SessionAdapter>,
            Some(Arc::clone(&llm) as Arc<dyn LlmService>),
            RunnerConfig {
                logs_dir: workdir.path().join("logs"),
                worktrees_dir: workdir.path().join("wt"),
                ..Default::default()
            },
        ));

        let pipelines = Arc::new(PipelineExecutor::new(
            pipeline_store.clone(),
            tasks.clone(),
            Arc::clone(&loader),
            Some(Arc::clone(&llm) as Arc<dyn LlmService>),
            workdir.path().to_path_buf(),
        ));

        let executor = Arc::new(ActionExecutor::new(ActionExecutorDeps {
            sessions: sessions.clone(),
            tasks: tasks.clone(),
            memories: memories.clone(),
            states: states.clone(),
            broadcaster: broadcaster.clone(),
            llm: Some(Arc::clone(&llm) as Arc<dyn LlmService>),
            vectors: None,
            tool_proxy: None,
            pipelines: Some(Arc::clone(&pipelines)),
            runner: Some(Arc::clone(&runner)),
            memory_enabled: true,
        }));

        let engine = Arc::new(WorkflowEngine::new(
            Arc::clone(&loader),
            states.clone(),
            Arc::clone(&executor),
        ));

        let hooks = Arc::new(HookManager::new(
            sessions.clone(),
            projects.clone(),
            prompts.clone(),
            engine,
            executor,
            broadcaster.clone(),
            Vec::new(),
            EventHandlerConfig {
                find_parent_attempts: 1,
                default_project_root: workdir.path().to_path_buf(),
                ..Default::default()
            },
        ));

        let state = AppState {
            adapters: AdapterRegistry::with_builtins(),
            hooks,
            sessions,
            tasks,
            memories,
            projects,
            prompts,
            agent_history,
            crons,
            pipeline_store,
            registry,
            runner,
            pipelines,
            broadcaster,
            tool_proxy: None,
            llm: Some(Arc::clone(&llm) as Arc<dyn LlmService>),
            terminal: Arc::clone(&terminal) as Arc<dyn SessionAdapter>,
            chats: ChatSessions::new(),
            auth_token: None,
            chat_idle_timeout_seconds: 1800,
            start_time: std::time::Instant::now(),
        };

        Self { state, llm, terminal, loader, pipeline_dir, workdir }
    }

    pub fn write_pipeline(&self, file: &str, yaml: &str) {
        std::fs::write(self.pipeline_dir.path().join(file), yaml).unwrap();
        self.loader.invalidate();
    }
}
