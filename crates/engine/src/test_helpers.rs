// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests

use crate::actions::{ActionExecutor, ActionExecutorDeps};
use crate::broadcaster::Broadcaster;
use crate::engine::WorkflowEngine;
use crate::llm::fakes::FakeLlm;
use crate::llm::LlmService;
use crate::pipeline::PipelineExecutor;
use crate::state_manager::WorkflowStateManager;
use gobby_core::SessionSource;
use gobby_storage::sessions::RegisterSession;
use gobby_storage::{
    Database, MemoryStore, PipelineStore, ProjectStore, PromptStore, SessionStore, TaskStore,
    WorkflowStateStore,
};
use gobby_workflow::{DefinitionLoader, LoaderDirs};
use std::sync::Arc;

pub struct TestWorld {
    pub db: Arc<Database>,
    pub sessions: SessionStore,
    pub tasks: TaskStore,
    pub memories: MemoryStore,
    pub projects: ProjectStore,
    pub prompts: PromptStore,
    pub states: WorkflowStateManager,
    pub loader: Arc<DefinitionLoader>,
    pub broadcaster: Broadcaster,
    pub llm: Arc<FakeLlm>,
    pub workflow_dir: tempfile::TempDir,
    pub pipeline_dir: tempfile::TempDir,
    pub workdir: tempfile::TempDir,
}

impl TestWorld {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let workflow_dir = tempfile::tempdir().unwrap();
        let pipeline_dir = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        let loader = Arc::new(DefinitionLoader::new(
            LoaderDirs {
                project: Some(workflow_dir.path().to_path_buf()),
                ..Default::default()
            },
            LoaderDirs {
                project: Some(pipeline_dir.path().to_path_buf()),
                ..Default::default()
            },
        ));
        Self {
            sessions: SessionStore::new(Arc::clone(&db)),
            tasks: TaskStore::new(Arc::clone(&db)),
            memories: MemoryStore::new(Arc::clone(&db)),
            projects: ProjectStore::new(Arc::clone(&db)),
            prompts: PromptStore::new(Arc::clone(&db)),
            states: WorkflowStateManager::new(WorkflowStateStore::new(Arc::clone(&db))),
            loader,
            broadcaster: Broadcaster::default(),
            llm: Arc::new(FakeLlm::default()),
            workflow_dir,
            pipeline_dir,
            workdir,
            db,
        }
    }

    pub fn write_workflow(&self, file: &str, yaml: &str) {
        std::fs::write(self.workflow_dir.path().join(file), yaml).unwrap();
        self.loader.invalidate();
    }

    pub fn write_pipeline(&self, file: &str, yaml: &str) {
        std::fs::write(self.pipeline_dir.path().join(file), yaml).unwrap();
        self.loader.invalidate();
    }

    pub fn session(&self, external_id: &str) -> gobby_core::Session {
        self.sessions
            .register(
                external_id,
                "m1",
                SessionSource::Claude,
                "p1",
                RegisterSession::default(),
            )
            .unwrap()
    }

    pub fn executor(&self) -> Arc<ActionExecutor> {
        Arc::new(ActionExecutor::new(ActionExecutorDeps {
            sessions: self.sessions.clone(),
            tasks: self.tasks.clone(),
            memories: self.memories.clone(),
            states: self.states.clone(),
            broadcaster: self.broadcaster.clone(),
            llm: Some(Arc::clone(&self.llm) as Arc<dyn LlmService>),
            vectors: None,
            tool_proxy: None,
            pipelines: None,
            runner: None,
            memory_enabled: true,
        }))
    }

    pub fn engine(&self) -> Arc<WorkflowEngine> {
        Arc::new(WorkflowEngine::new(
            Arc::clone(&self.loader),
            self.states.clone(),
            self.executor(),
        ))
    }

    pub fn pipeline_executor(&self) -> Arc<PipelineExecutor> {
        Arc::new(PipelineExecutor::new(
            PipelineStore::new(Arc::clone(&self.db)),
            self.tasks.clone(),
            Arc::clone(&self.loader),
            Some(Arc::clone(&self.llm) as Arc<dyn LlmService>),
            self.workdir.path().to_path_buf(),
        ))
    }

    pub fn pipeline_store(&self) -> PipelineStore {
        PipelineStore::new(Arc::clone(&self.db))
    }
}
