// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gobby-engine: Orchestration core
//!
//! The workflow engine, action executor, pipeline executor, agent runner,
//! running-agent registry, hook manager, and cron scheduler. Everything
//! here is wired from explicit values passed into constructors; there is
//! no global state.

pub mod actions;
pub mod background;
pub mod broadcaster;
pub mod conditions;
pub mod engine;
pub mod evaluator;
pub mod handoff;
pub mod hooks;
pub mod llm;
pub mod pipeline;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod state_manager;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_helpers;

use gobby_core::PipelineExecutionId;
use thiserror::Error;

/// Engine failure kinds.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] gobby_storage::StorageError),

    #[error("workflow error: {0}")]
    Workflow(String),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Pipeline hit an approval gate. Not a failure: the caller holds
    /// the token and resumes via `approve`.
    #[error("approval required for step '{step_id}' of {execution_id}")]
    ApprovalRequired {
        execution_id: PipelineExecutionId,
        step_id: String,
        token: String,
        message: Option<String>,
    },

    /// `can_spawn` refused; surfaced as SPAWN_DEPTH_EXCEEDED.
    #[error("spawn depth exceeded: depth {current_depth} >= max {max_depth}")]
    DepthExceeded { current_depth: u32, max_depth: u32 },

    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("shell error: {0}")]
    Subprocess(#[from] gobby_adapters::SubprocessError),

    #[error("llm service unavailable")]
    LlmUnavailable,
}

impl EngineError {
    /// Stable machine-readable kind string for tool/HTTP error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.kind(),
            Self::NotFound(_, _) => "not_found",
            Self::Validation(_) | Self::Workflow(_) => "validation_failed",
            Self::ApprovalRequired { .. } => "approval_required",
            Self::DepthExceeded { .. } => "depth_exceeded",
            Self::SpawnFailed(_) | Self::Subprocess(_) | Self::LlmUnavailable => "internal",
        }
    }
}

pub use actions::{ActionContext, ActionExecutor};
pub use background::BackgroundTasks;
pub use broadcaster::{BroadcastMessage, Broadcaster};
pub use engine::WorkflowEngine;
pub use evaluator::{evaluate_event, EvaluationResult, WorkflowInstance, EXEMPT_TOOLS};
pub use hooks::{EventHandlerConfig, HookManager};
pub use llm::{LlmRequest, LlmService, ToolProxy, VectorStore};
pub use pipeline::PipelineExecutor;
pub use registry::{EventCallback, RunningAgentRegistry};
pub use runner::{AgentRunner, RunnerConfig, SpawnRequest, SpawnResult};
pub use scheduler::{compute_next_run, CronScheduler, SchedulerConfig};
pub use state_manager::WorkflowStateManager;
pub use webhooks::{HookWebhook, WebhookClient};
