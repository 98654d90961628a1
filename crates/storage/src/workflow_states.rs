// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow state store
//!
//! One row per `(session_id, workflow_name)`. `mutate` is the atomic
//! read-modify-write primitive every orchestration update goes through:
//! the closure runs inside a single transaction so concurrent dispatchers
//! cannot interleave between read and write.

use crate::{Database, StorageError};
use gobby_core::{utc_now_iso, WorkflowState};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

#[derive(Clone)]
pub struct WorkflowStateStore {
    db: Arc<Database>,
}

const COLS: &str = "session_id, workflow_name, step, step_entered_at, step_action_count, \
                    total_action_count, observations, variables, context_injected, \
                    reflection_pending, updated_at";

fn row_to_state(row: &Row) -> rusqlite::Result<WorkflowState> {
    let observations: String = row.get(6)?;
    let variables: String = row.get(7)?;
    Ok(WorkflowState {
        session_id: row.get(0)?,
        workflow_name: row.get(1)?,
        step: row.get(2)?,
        step_entered_at: row.get(3)?,
        step_action_count: row.get::<_, i64>(4)? as u64,
        total_action_count: row.get::<_, i64>(5)? as u64,
        observations: serde_json::from_str(&observations).unwrap_or_default(),
        variables: serde_json::from_str(&variables).unwrap_or_default(),
        context_injected: row.get::<_, i64>(8)? != 0,
        reflection_pending: row.get::<_, i64>(9)? != 0,
        updated_at: row.get(10)?,
    })
}

fn save_in_tx(tx: &rusqlite::Transaction, state: &WorkflowState) -> Result<(), StorageError> {
    let observations = serde_json::to_string(&state.observations)?;
    let variables = serde_json::to_string(&state.variables)?;
    tx.execute(
        r#"
        INSERT INTO workflow_states (
            session_id, workflow_name, step, step_entered_at, step_action_count,
            total_action_count, observations, variables, context_injected,
            reflection_pending, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT (session_id, workflow_name) DO UPDATE SET
            step = excluded.step,
            step_entered_at = excluded.step_entered_at,
            step_action_count = excluded.step_action_count,
            total_action_count = excluded.total_action_count,
            observations = excluded.observations,
            variables = excluded.variables,
            context_injected = excluded.context_injected,
            reflection_pending = excluded.reflection_pending,
            updated_at = excluded.updated_at
        "#,
        params![
            state.session_id,
            state.workflow_name,
            state.step,
            state.step_entered_at,
            state.step_action_count as i64,
            state.total_action_count as i64,
            observations,
            variables,
            state.context_injected as i64,
            state.reflection_pending as i64,
            utc_now_iso(),
        ],
    )?;
    Ok(())
}

impl WorkflowStateStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn get(
        &self,
        session_id: &str,
        workflow_name: &str,
    ) -> Result<Option<WorkflowState>, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {COLS} FROM workflow_states \
                         WHERE session_id = ?1 AND workflow_name = ?2"
                    ),
                    params![session_id, workflow_name],
                    row_to_state,
                )
                .optional()?)
        })
    }

    pub fn list_for_session(&self, session_id: &str) -> Result<Vec<WorkflowState>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLS} FROM workflow_states \
                 WHERE session_id = ?1 ORDER BY workflow_name"
            ))?;
            let states = stmt
                .query_map(params![session_id], row_to_state)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(states)
        })
    }

    pub fn save(&self, state: &WorkflowState) -> Result<(), StorageError> {
        self.db.with_tx(|tx| save_in_tx(tx, state))
    }

    /// Atomic read-modify-write: fetch (or create) the row, apply `f`,
    /// persist — all within one transaction. Returns the closure result.
    pub fn mutate<T>(
        &self,
        session_id: &str,
        workflow_name: &str,
        f: impl FnOnce(&mut WorkflowState) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        self.db.with_tx(|tx| {
            let mut state = tx
                .query_row(
                    &format!(
                        "SELECT {COLS} FROM workflow_states \
                         WHERE session_id = ?1 AND workflow_name = ?2"
                    ),
                    params![session_id, workflow_name],
                    row_to_state,
                )
                .optional()?
                .unwrap_or_else(|| WorkflowState::new(session_id, workflow_name));
            let result = f(&mut state)?;
            save_in_tx(tx, &state)?;
            Ok(result)
        })
    }

    pub fn delete(&self, session_id: &str, workflow_name: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM workflow_states WHERE session_id = ?1 AND workflow_name = ?2",
                params![session_id, workflow_name],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "workflow_states_tests.rs"]
mod tests;
