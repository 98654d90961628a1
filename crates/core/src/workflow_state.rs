// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session workflow instance state
//!
//! One row per `(session_id, workflow_name)`. `variables` is a free-form
//! JSON mapping; the orchestration keys (`spawned_agents`,
//! `completed_agents`, `failed_agents`, `_reserved_slots`) have typed
//! accessors because the slot-reservation math depends on them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const VAR_SPAWNED_AGENTS: &str = "spawned_agents";
pub const VAR_COMPLETED_AGENTS: &str = "completed_agents";
pub const VAR_FAILED_AGENTS: &str = "failed_agents";
pub const VAR_RESERVED_SLOTS: &str = "_reserved_slots";
pub const VAR_CURRENT_TASK_ID: &str = "current_task_id";
pub const VAR_PENDING_PIPELINE: &str = "pending_pipeline";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: String,
    pub workflow_name: String,
    /// Current step name; empty until the workflow enters its first step.
    #[serde(default)]
    pub step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_entered_at: Option<String>,
    #[serde(default)]
    pub step_action_count: u64,
    #[serde(default)]
    pub total_action_count: u64,
    #[serde(default)]
    pub observations: Vec<String>,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default)]
    pub context_injected: bool,
    #[serde(default)]
    pub reflection_pending: bool,
    pub updated_at: String,
}

impl WorkflowState {
    pub fn new(session_id: impl Into<String>, workflow_name: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            workflow_name: workflow_name.into(),
            step: String::new(),
            step_entered_at: None,
            step_action_count: 0,
            total_action_count: 0,
            observations: Vec::new(),
            variables: HashMap::new(),
            context_injected: false,
            reflection_pending: false,
            updated_at: crate::time_fmt::utc_now_iso(),
        }
    }

    fn string_list(&self, key: &str) -> Vec<String> {
        self.variables
            .get(key)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter().filter_map(Value::as_str).map(str::to_string).collect()
            })
            .unwrap_or_default()
    }

    pub fn spawned_agents(&self) -> Vec<String> {
        self.string_list(VAR_SPAWNED_AGENTS)
    }

    pub fn completed_agents(&self) -> Vec<String> {
        self.string_list(VAR_COMPLETED_AGENTS)
    }

    pub fn failed_agents(&self) -> Vec<String> {
        self.string_list(VAR_FAILED_AGENTS)
    }

    pub fn reserved_slots(&self) -> u64 {
        self.variables.get(VAR_RESERVED_SLOTS).and_then(Value::as_u64).unwrap_or(0)
    }

    pub fn set_reserved_slots(&mut self, n: u64) {
        self.variables.insert(VAR_RESERVED_SLOTS.to_string(), Value::from(n));
    }

    pub fn set_string_list(&mut self, key: &str, values: Vec<String>) {
        self.variables.insert(key.to_string(), Value::from(values));
    }
}

#[cfg(test)]
#[path = "workflow_state_tests.rs"]
mod tests;
