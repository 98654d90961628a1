// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running-agent registry
//!
//! Process-wide, thread-safe index of live child agents keyed by run id.
//! Lifecycle callbacks are snapshotted under a separate lock and invoked
//! strictly outside the state lock; a callback that fails is logged and
//! swallowed.

use gobby_core::{parse_iso, AgentRunId, RunningAgent};
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback payload: `(event_type, run_id, data)`. A returned error is
/// logged and swallowed; it never affects registry state.
pub type EventCallback =
    Arc<dyn Fn(&str, &AgentRunId, &serde_json::Value) -> Result<(), String> + Send + Sync>;

pub struct RunningAgentRegistry {
    // ReentrantMutex so a same-thread re-entry from diagnostic paths
    // cannot deadlock; mutation goes through the RefCell.
    agents: ReentrantMutex<RefCell<HashMap<AgentRunId, RunningAgent>>>,
    callbacks: Mutex<Vec<EventCallback>>,
}

impl Default for RunningAgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningAgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: ReentrantMutex::new(RefCell::new(HashMap::new())),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Register a lifecycle callback.
    pub fn add_event_callback(&self, callback: EventCallback) {
        self.callbacks.lock().push(callback);
    }

    /// Invoke callbacks with the state lock released. The callback list
    /// is snapshotted first so registration during delivery is safe.
    fn emit(&self, event_type: &str, run_id: &AgentRunId, data: serde_json::Value) {
        let callbacks: Vec<EventCallback> = self.callbacks.lock().clone();
        for callback in callbacks {
            if let Err(e) = callback(event_type, run_id, &data) {
                tracing::warn!(event_type, %run_id, error = %e, "registry callback error");
            }
        }
    }

    fn event_data(agent: &RunningAgent) -> serde_json::Value {
        serde_json::json!({
            "session_id": agent.session_id,
            "parent_session_id": agent.parent_session_id,
            "mode": agent.mode.as_str(),
            "provider": agent.provider,
            "pid": agent.pid,
        })
    }

    pub fn add(&self, agent: RunningAgent) {
        let run_id = agent.run_id.clone();
        let data = Self::event_data(&agent);
        {
            let guard = self.agents.lock();
            guard.borrow_mut().insert(run_id.clone(), agent);
        }
        tracing::debug!(%run_id, "registered running agent");
        self.emit("agent_started", &run_id, data);
    }

    pub fn get(&self, run_id: &AgentRunId) -> Option<RunningAgent> {
        let guard = self.agents.lock();
        let map = guard.borrow();
        map.get(run_id).cloned()
    }

    /// Remove an agent, emitting `agent_{status}`.
    pub fn remove(&self, run_id: &AgentRunId, status: &str) -> Option<RunningAgent> {
        let removed = {
            let guard = self.agents.lock();
            let mut map = guard.borrow_mut();
            map.remove(run_id)
        };
        if let Some(agent) = &removed {
            tracing::debug!(%run_id, status, "unregistered running agent");
            let data = Self::event_data(agent);
            self.emit(&format!("agent_{status}"), run_id, data);
        }
        removed
    }

    pub fn get_by_session(&self, session_id: &str) -> Option<RunningAgent> {
        let guard = self.agents.lock();
        let map = guard.borrow();
        map.values().find(|a| a.session_id == session_id).cloned()
    }

    pub fn get_by_pid(&self, pid: u32) -> Option<RunningAgent> {
        let guard = self.agents.lock();
        let map = guard.borrow();
        map.values().find(|a| a.pid == Some(pid)).cloned()
    }

    pub fn list_by_parent(&self, parent_session_id: &str) -> Vec<RunningAgent> {
        let guard = self.agents.lock();
        let map = guard.borrow();
        map.values()
            .filter(|a| a.parent_session_id == parent_session_id)
            .cloned()
            .collect()
    }

    pub fn list_by_mode(&self, mode: gobby_core::AgentMode) -> Vec<RunningAgent> {
        let guard = self.agents.lock();
        let map = guard.borrow();
        map.values().filter(|a| a.mode == mode).cloned().collect()
    }

    pub fn list_all(&self) -> Vec<RunningAgent> {
        let guard = self.agents.lock();
        let map = guard.borrow();
        map.values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        let guard = self.agents.lock();
        let len = guard.borrow().len();
        len
    }

    pub fn count_by_parent(&self, parent_session_id: &str) -> usize {
        let guard = self.agents.lock();
        let map = guard.borrow();
        map.values().filter(|a| a.parent_session_id == parent_session_id).count()
    }

    /// Remove agents whose PIDs are confirmed dead.
    pub fn cleanup_by_pids(&self, dead_pids: &[u32]) -> Vec<RunningAgent> {
        let removed: Vec<RunningAgent> = {
            let guard = self.agents.lock();
            let mut map = guard.borrow_mut();
            let ids: Vec<AgentRunId> = map
                .values()
                .filter(|a| a.pid.map(|p| dead_pids.contains(&p)).unwrap_or(false))
                .map(|a| a.run_id.clone())
                .collect();
            ids.iter().filter_map(|id| map.remove(id)).collect()
        };
        for agent in &removed {
            tracing::info!(run_id = %agent.run_id, pid = ?agent.pid, "cleaned up agent with dead pid");
            self.emit("agent_completed", &agent.run_id, Self::event_data(agent));
        }
        removed
    }

    /// Remove agents older than `max_age_seconds`, emitting
    /// `agent_timeout` for each.
    pub fn cleanup_stale(&self, max_age_seconds: u64, now: chrono::DateTime<chrono::Utc>) -> Vec<RunningAgent> {
        let removed: Vec<RunningAgent> = {
            let guard = self.agents.lock();
            let mut map = guard.borrow_mut();
            let ids: Vec<AgentRunId> = map
                .values()
                .filter(|a| {
                    parse_iso(&a.started_at)
                        .map(|started| (now - started).num_seconds() as u64 > max_age_seconds)
                        .unwrap_or(false)
                })
                .map(|a| a.run_id.clone())
                .collect();
            ids.iter().filter_map(|id| map.remove(id)).collect()
        };
        for agent in &removed {
            tracing::info!(run_id = %agent.run_id, "cleaned up stale agent");
            self.emit("agent_timeout", &agent.run_id, Self::event_data(agent));
        }
        removed
    }

    pub fn clear(&self) -> usize {
        let count = {
            let guard = self.agents.lock();
            let mut map = guard.borrow_mut();
            let count = map.len();
            map.clear();
            count
        };
        tracing::info!(count, "cleared running agents from registry");
        count
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
