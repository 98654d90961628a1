// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gobby-storage: SQLite persistence for the Gobby daemon
//!
//! A single embedded database owns every durable entity. Store structs
//! are thin CRUD layers with explicit invariants; in-memory caches are
//! derived views owned by callers.

pub mod agents;
pub mod crons;
pub mod db;
pub mod memories;
pub mod migrations;
pub mod pipelines;
pub mod projects;
pub mod prompts;
pub mod sessions;
pub mod tasks;
pub mod workflow_states;
pub mod worktrees;

use thiserror::Error;

/// Storage failure kinds.
///
/// `NotFound` and the task validation variants are the structured errors
/// callers branch on; everything else bubbles up as internal failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// Caller-supplied inputs violate an invariant.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Hard block: `no_commit_needed` conflicts with uncommitted tracked
    /// changes.
    #[error("uncommitted changes: {0}")]
    UncommittedChanges(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    /// Stable machine-readable kind string for tool/HTTP error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::TaskNotFound(_) => "not_found",
            Self::Validation(_) => "validation_failed",
            Self::UncommittedChanges(_) => "uncommitted_changes",
            Self::Sqlite(_) | Self::Json(_) | Self::Io(_) => "internal",
        }
    }
}

pub use agents::{AgentRecord, AgentStore};
pub use crons::CronStore;
pub use db::Database;
pub use memories::MemoryStore;
pub use pipelines::PipelineStore;
pub use projects::ProjectStore;
pub use prompts::PromptStore;
pub use sessions::SessionStore;
pub use tasks::{CloseOptions, TaskStore};
pub use workflow_states::WorkflowStateStore;
pub use worktrees::WorktreeStore;
