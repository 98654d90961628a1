// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow state manager
//!
//! Atomic read-modify-write over per-session workflow state. The slot
//! reservation primitives close the TOCTOU window between "check
//! capacity" and "spawn agent" when two dispatchers act concurrently on
//! the same orchestrator session: both the check and the reservation
//! happen inside one storage transaction.

use crate::EngineError;
use gobby_core::workflow_state::{
    VAR_COMPLETED_AGENTS, VAR_FAILED_AGENTS, VAR_SPAWNED_AGENTS,
};
use gobby_core::{utc_now_iso, WorkflowState};
use gobby_storage::WorkflowStateStore;
use std::sync::Arc;

/// List edits applied by [`WorkflowStateManager::update_orchestration_lists`].
#[derive(Debug, Clone, Default)]
pub struct OrchestrationUpdate {
    pub append_to_spawned: Vec<String>,
    /// Takes precedence over `remove_from_spawned`.
    pub replace_spawned: Option<Vec<String>>,
    pub remove_from_spawned: Vec<String>,
    pub append_to_completed: Vec<String>,
    pub append_to_failed: Vec<String>,
}

#[derive(Clone)]
pub struct WorkflowStateManager {
    store: WorkflowStateStore,
}

impl WorkflowStateManager {
    pub fn new(store: WorkflowStateStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &WorkflowStateStore {
        &self.store
    }

    pub fn get(
        &self,
        session_id: &str,
        workflow_name: &str,
    ) -> Result<Option<WorkflowState>, EngineError> {
        Ok(self.store.get(session_id, workflow_name)?)
    }

    pub fn list_for_session(&self, session_id: &str) -> Result<Vec<WorkflowState>, EngineError> {
        Ok(self.store.list_for_session(session_id)?)
    }

    /// Create the instance row if missing, seeding step and variables
    /// from the definition.
    pub fn get_or_create(
        &self,
        session_id: &str,
        workflow_name: &str,
        initial_step: &str,
        defaults: &std::collections::HashMap<String, serde_json::Value>,
    ) -> Result<WorkflowState, EngineError> {
        if let Some(state) = self.store.get(session_id, workflow_name)? {
            return Ok(state);
        }
        self.store.mutate(session_id, workflow_name, |state| {
            if state.step.is_empty() {
                state.step = initial_step.to_string();
                state.step_entered_at = Some(utc_now_iso());
            }
            for (key, value) in defaults {
                state.variables.entry(key.clone()).or_insert_with(|| value.clone());
            }
            Ok(state.clone())
        })
        .map_err(Into::into)
    }

    /// Move an instance to a new step, resetting the per-step action
    /// counter.
    pub fn transition_step(
        &self,
        session_id: &str,
        workflow_name: &str,
        to_step: &str,
    ) -> Result<(), EngineError> {
        self.store.mutate(session_id, workflow_name, |state| {
            state.step = to_step.to_string();
            state.step_entered_at = Some(utc_now_iso());
            state.step_action_count = 0;
            Ok(())
        })?;
        Ok(())
    }

    pub fn record_observation(
        &self,
        session_id: &str,
        workflow_name: &str,
        observation: &str,
    ) -> Result<(), EngineError> {
        self.store.mutate(session_id, workflow_name, |state| {
            state.observations.push(observation.to_string());
            Ok(())
        })?;
        Ok(())
    }

    /// Apply list edits in one transaction, preserving unrelated
    /// variables. `replace_spawned` wins over `remove_from_spawned`.
    pub fn update_orchestration_lists(
        &self,
        session_id: &str,
        workflow_name: &str,
        update: OrchestrationUpdate,
    ) -> Result<WorkflowState, EngineError> {
        self.store
            .mutate(session_id, workflow_name, move |state| {
                let mut spawned = state.spawned_agents();
                match &update.replace_spawned {
                    Some(replacement) => spawned = replacement.clone(),
                    None => {
                        spawned.retain(|id| !update.remove_from_spawned.contains(id));
                    }
                }
                for id in &update.append_to_spawned {
                    if !spawned.contains(id) {
                        spawned.push(id.clone());
                    }
                }
                state.set_string_list(VAR_SPAWNED_AGENTS, spawned);

                if !update.append_to_completed.is_empty() {
                    let mut completed = state.completed_agents();
                    for id in &update.append_to_completed {
                        if !completed.contains(id) {
                            completed.push(id.clone());
                        }
                    }
                    state.set_string_list(VAR_COMPLETED_AGENTS, completed);
                }
                if !update.append_to_failed.is_empty() {
                    let mut failed = state.failed_agents();
                    for id in &update.append_to_failed {
                        if !failed.contains(id) {
                            failed.push(id.clone());
                        }
                    }
                    state.set_string_list(VAR_FAILED_AGENTS, failed);
                }
                Ok(state.clone())
            })
            .map_err(Into::into)
    }

    /// Reserve up to `requested` spawn slots against `max_concurrent`.
    ///
    /// `active = len(spawned_agents) + _reserved_slots`; the reservation
    /// is computed and persisted inside one transaction, so concurrent
    /// callers can never jointly exceed the cap. Returns the number of
    /// slots actually reserved (possibly zero).
    pub fn check_and_reserve_slots(
        &self,
        session_id: &str,
        workflow_name: &str,
        max_concurrent: u64,
        requested: u64,
    ) -> Result<u64, EngineError> {
        self.store
            .mutate(session_id, workflow_name, move |state| {
                let active = state.spawned_agents().len() as u64 + state.reserved_slots();
                let available = max_concurrent.saturating_sub(active);
                let granted = requested.min(available);
                if granted > 0 {
                    state.set_reserved_slots(state.reserved_slots() + granted);
                }
                Ok(granted)
            })
            .map_err(Into::into)
    }

    /// Release reserved slots, flooring at zero.
    pub fn release_reserved_slots(
        &self,
        session_id: &str,
        workflow_name: &str,
        n: u64,
    ) -> Result<(), EngineError> {
        self.store.mutate(session_id, workflow_name, move |state| {
            state.set_reserved_slots(state.reserved_slots().saturating_sub(n));
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_manager_tests.rs"]
mod tests;
