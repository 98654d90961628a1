// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP server
//!
//! Route table for the control plane. Hook ingest delegates to the
//! adapter registry; everything else is a thin layer over the stores and
//! executors, with SQLite work pushed through `spawn_blocking`.

mod crons;
mod error;
mod files;
mod hooks;
mod mcp;
mod pipelines;
mod rest;

pub use error::ApiError;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

/// Build the full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Hook ingest, one slug per CLI adapter.
        .route("/hooks/{adapter}", post(hooks::ingest))
        // Daemon status.
        .route("/api/status", get(rest::status))
        // Sessions.
        .route("/api/sessions", get(rest::list_sessions))
        .route("/api/sessions/{id}", get(rest::get_session))
        // Tasks.
        .route("/api/tasks", get(rest::list_tasks).post(rest::create_task))
        .route("/api/tasks/{reference}", get(rest::get_task))
        .route("/api/tasks/{reference}/close", post(rest::close_task))
        // Agents.
        .route("/api/agents", get(rest::list_agents))
        .route("/api/agents/spawn", post(rest::spawn_agent))
        .route("/api/agents/can-spawn/{session_id}", get(rest::can_spawn))
        // Memories.
        .route("/api/memories", get(rest::list_memories).post(rest::create_memory))
        // Cron jobs.
        .route("/api/cron/jobs", get(rest::list_cron_jobs).post(crons::add))
        .route("/api/cron/jobs/{reference}", get(crons::get).patch(crons::edit).delete(crons::remove))
        .route("/api/cron/jobs/{reference}/toggle", post(crons::toggle))
        .route("/api/cron/jobs/{reference}/run", post(crons::run_now))
        .route("/api/cron/jobs/{reference}/runs", get(crons::runs))
        // Pipelines.
        .route("/api/pipelines/run", post(pipelines::run))
        .route("/api/pipelines/approve/{token}", post(pipelines::approve))
        .route("/api/pipelines/{execution_id}", get(pipelines::get_execution))
        // File browser.
        .route("/api/files/projects", get(files::projects))
        .route("/api/files/tree", get(files::tree))
        .route("/api/files/read", get(files::read))
        .route("/api/files/image", get(files::image))
        .route("/api/files/git-status", get(files::git_status))
        .route("/api/files/git-diff", get(files::git_diff))
        .route("/api/files/write", post(files::write))
        // MCP proxy passthrough.
        .route("/mcp/servers", get(mcp::list_servers))
        .route("/mcp/call/{server}/{tool}", post(mcp::call_tool))
        // WebSocket upgrade shares the HTTP listener.
        .route("/ws", get(crate::ws::upgrade))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
