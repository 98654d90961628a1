// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent run history store
//!
//! Durable record of spawned agents; the live registry is the in-memory
//! view, this table is what survives restarts and feeds the REST list.

use crate::{Database, StorageError};
use gobby_core::{utc_now_iso, AgentMode, AgentRunId};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One row of agent run history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentRunId,
    pub session_id: Option<String>,
    pub parent_session_id: Option<String>,
    pub mode: AgentMode,
    pub provider: String,
    pub workflow_name: Option<String>,
    pub status: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub exit_reason: Option<String>,
}

#[derive(Clone)]
pub struct AgentStore {
    db: Arc<Database>,
}

const COLS: &str = "id, session_id, parent_session_id, mode, provider, workflow_name, status, \
                    started_at, finished_at, exit_reason";

fn row_to_record(row: &Row) -> rusqlite::Result<AgentRecord> {
    let id: String = row.get(0)?;
    let mode: String = row.get(3)?;
    Ok(AgentRecord {
        id: AgentRunId::from_string(id),
        session_id: row.get(1)?,
        parent_session_id: row.get(2)?,
        mode: AgentMode::parse(&mode).unwrap_or(AgentMode::Headless),
        provider: row.get(4)?,
        workflow_name: row.get(5)?,
        status: row.get(6)?,
        started_at: row.get(7)?,
        finished_at: row.get(8)?,
        exit_reason: row.get(9)?,
    })
}

impl AgentStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn record_start(
        &self,
        id: &AgentRunId,
        session_id: &str,
        parent_session_id: &str,
        mode: AgentMode,
        provider: &str,
        workflow_name: Option<&str>,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO agents (
                    id, session_id, parent_session_id, mode, provider,
                    workflow_name, status, started_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'running', ?7)
                "#,
                params![
                    id.as_str(),
                    session_id,
                    parent_session_id,
                    mode.as_str(),
                    provider,
                    workflow_name,
                    now
                ],
            )?;
            Ok(())
        })
    }

    pub fn record_finish(
        &self,
        id: &AgentRunId,
        status: &str,
        exit_reason: Option<&str>,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE agents SET status = ?2, exit_reason = ?3, finished_at = ?4 WHERE id = ?1",
                params![id.as_str(), status, exit_reason, now],
            )?;
            Ok(())
        })
    }

    pub fn get(&self, id: &AgentRunId) -> Result<AgentRecord, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COLS} FROM agents WHERE id = ?1"),
                params![id.as_str()],
                row_to_record,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("agent", id.as_str()))
        })
    }

    pub fn list_recent(&self, limit: usize) -> Result<Vec<AgentRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLS} FROM agents ORDER BY started_at DESC LIMIT ?1"
            ))?;
            let records = stmt
                .query_map(params![limit as i64], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
