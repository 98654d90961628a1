// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, shutdown, recovery
//!
//! Startup order: state dir + PID lock, database + migrations, component
//! wiring (explicit values, no globals), background loops (scheduler,
//! registry housekeeping, chat eviction). Shutdown cancels the token,
//! aborts background actions, and releases the lock by dropping it.

use crate::config::DaemonConfig;
use crate::state::AppState;
use crate::ws::chat::ChatSessions;
use fs2::FileExt;
use gobby_adapters::{AdapterRegistry, SessionAdapter, TmuxAdapter};
use gobby_engine::actions::{ActionExecutor, ActionExecutorDeps};
use gobby_engine::{
    AgentRunner, Broadcaster, CronScheduler, EventHandlerConfig, HookManager, PipelineExecutor,
    RunnerConfig, RunningAgentRegistry, SchedulerConfig, WorkflowEngine, WorkflowStateManager,
};
use gobby_core::SystemClock;
use gobby_storage::{
    AgentStore, CronStore, Database, MemoryStore, PipelineStore, ProjectStore, PromptStore,
    SessionStore, TaskStore, WorkflowStateStore,
};
use gobby_workflow::{DefinitionLoader, LoaderDirs};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("state dir error: {0}")]
    StateDir(String),
    #[error("another daemon instance holds the lock at {0}")]
    AlreadyRunning(PathBuf),
    #[error(transparent)]
    Storage(#[from] gobby_storage::StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Filesystem layout under the daemon's state directory.
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pub state_dir: PathBuf,
    pub database: PathBuf,
    pub lock: PathBuf,
    pub logs_dir: PathBuf,
    pub worktrees_dir: PathBuf,
}

impl DaemonPaths {
    /// Fixed layout under `~/.local/state/gobby` (or XDG equivalent).
    pub fn resolve(config: &DaemonConfig) -> Result<Self, LifecycleError> {
        let state_dir = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| LifecycleError::StateDir("no state directory available".to_string()))?
            .join("gobby");
        std::fs::create_dir_all(&state_dir)
            .map_err(|e| LifecycleError::StateDir(e.to_string()))?;
        let logs_dir = config
            .logging
            .dir
            .clone()
            .unwrap_or_else(|| state_dir.join("logs"));
        Ok(Self {
            database: config.database_path(&state_dir),
            lock: state_dir.join("gobbyd.pid"),
            worktrees_dir: state_dir.join("worktrees"),
            logs_dir,
            state_dir,
        })
    }
}

/// Everything `main` needs after startup.
pub struct StartupResult {
    pub state: AppState,
    pub shutdown: CancellationToken,
    pub paths: DaemonPaths,
    // NOTE(lifetime): held to maintain the exclusive PID lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

/// Wire the daemon from config. Fatal errors (lock held, storage
/// corruption) abort startup.
pub fn startup(config: &DaemonConfig, paths: DaemonPaths) -> Result<StartupResult, LifecycleError> {
    // PID lock: exactly one daemon per state dir. Opened without
    // truncation so a losing contender cannot clobber the holder's pid.
    let lock_file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.lock)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| LifecycleError::AlreadyRunning(paths.lock.clone()))?;
    std::fs::write(&paths.lock, format!("{}\n", std::process::id()))?;

    let db = Arc::new(Database::open(&paths.database)?);
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
        definition_dirs("workflows", &paths),
        definition_dirs("pipelines", &paths),
    ));

    // External seams: none are bundled; operators wire providers in via
    // their own builds or sidecar processes.
    let llm: Option<Arc<dyn gobby_engine::LlmService>> = None;
    let tool_proxy: Option<Arc<dyn gobby_engine::ToolProxy>> = None;

    let registry = Arc::new(RunningAgentRegistry::new());
    let broadcaster = Broadcaster::default();
    let terminal: Arc<dyn SessionAdapter> = Arc::new(TmuxAdapter::new());

    let runner = Arc::new(AgentRunner::new(
        sessions.clone(),
        projects.clone(),
        gobby_storage::WorktreeStore::new(Arc::clone(&db)),
        agent_history.clone(),
        Arc::clone(&registry),
        Arc::clone(&terminal),
        llm.clone(),
        RunnerConfig {
            max_depth: config.agents.max_depth,
            default_provider: config.agents.default_provider.clone(),
            logs_dir: paths.logs_dir.clone(),
            worktrees_dir: paths.worktrees_dir.clone(),
            ..Default::default()
        },
    ));

    let pipelines = Arc::new(PipelineExecutor::new(
        pipeline_store.clone(),
        tasks.clone(),
        Arc::clone(&loader),
        llm.clone(),
        paths.state_dir.clone(),
    ));

    let executor = Arc::new(ActionExecutor::new(ActionExecutorDeps {
        sessions: sessions.clone(),
        tasks: tasks.clone(),
        memories: memories.clone(),
        states: states.clone(),
        broadcaster: broadcaster.clone(),
        llm: llm.clone(),
        vectors: None,
        tool_proxy: tool_proxy.clone(),
        pipelines: Some(Arc::clone(&pipelines)),
        runner: Some(Arc::clone(&runner)),
        memory_enabled: config.memory.enabled,
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
        Arc::clone(&engine),
        Arc::clone(&executor),
        broadcaster.clone(),
        Vec::new(),
        EventHandlerConfig::default(),
    ));

    let shutdown = CancellationToken::new();

    // Scheduler loop.
    let scheduler = CronScheduler::new(
        crons.clone(),
        Some(Arc::clone(&runner)),
        Some(Arc::clone(&pipelines)),
        SystemClock,
        SchedulerConfig {
            poll_interval: Duration::from_secs(config.scheduler.poll_seconds),
            max_concurrent_runs: config.scheduler.max_concurrent_runs,
            auto_disable_after: config.scheduler.auto_disable_after,
            workdir: paths.state_dir.clone(),
            ..Default::default()
        },
    );
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await });
    }

    let chats = ChatSessions::new();

    // Housekeeping: stale agent reaping and idle chat eviction.
    {
        let runner = Arc::clone(&runner);
        let registry = Arc::clone(&registry);
        let chats = chats.clone();
        let stale_after = config.agents.stale_timeout_seconds;
        let chat_idle = config
            .websocket
            .as_ref()
            .map(|ws| ws.chat_idle_timeout_seconds)
            .unwrap_or(1800);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = ticker.tick() => {
                        runner.reap_dead();
                        registry.cleanup_stale(stale_after, chrono::Utc::now());
                        chats.evict_idle(Duration::from_secs(chat_idle));
                    }
                }
            }
        });
    }

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
        tool_proxy,
        llm,
        terminal,
        chats,
        auth_token: config.server.auth_token.clone(),
        chat_idle_timeout_seconds: config
            .websocket
            .as_ref()
            .map(|ws| ws.chat_idle_timeout_seconds)
            .unwrap_or(1800),
        start_time: std::time::Instant::now(),
    };

    Ok(StartupResult { state, shutdown, paths, lock_file })
}

/// Workflow/pipeline definition tiers: bundled under the state dir,
/// user under `~/.gobby`, project resolved per request via sidecars.
fn definition_dirs(kind: &str, paths: &DaemonPaths) -> LoaderDirs {
    LoaderDirs {
        bundled: Some(paths.state_dir.join("bundled").join(kind)),
        user: dirs::home_dir().map(|home| home.join(".gobby").join(kind)),
        project: Some(PathBuf::from(".gobby").join(kind)),
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
