// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session store
//!
//! `register` is an upsert on the unique `(external_id, machine_id,
//! source)` tuple; incoming NULL fields never clobber stored values.

use crate::{Database, StorageError};
use gobby_core::{new_uuid, utc_now_iso, Session, SessionSource, SessionStatus};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

/// Fields accepted by [`SessionStore::register`]; everything optional is
/// preserved from the existing row when absent.
#[derive(Debug, Clone, Default)]
pub struct RegisterSession {
    pub title: Option<String>,
    pub jsonl_path: Option<String>,
    pub git_branch: Option<String>,
    pub parent_session_id: Option<String>,
    pub agent_depth: Option<u32>,
}

#[derive(Clone)]
pub struct SessionStore {
    db: Arc<Database>,
}

const COLS: &str = "id, external_id, machine_id, source, project_id, title, status, jsonl_path, \
                    summary_markdown, compact_markdown, git_branch, parent_session_id, \
                    agent_depth, created_at, updated_at, transcript_processed";

fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
    let source: String = row.get(3)?;
    let status: String = row.get(6)?;
    Ok(Session {
        id: row.get(0)?,
        external_id: row.get(1)?,
        machine_id: row.get(2)?,
        source: SessionSource::parse(&source).unwrap_or(SessionSource::Claude),
        project_id: row.get(4)?,
        title: row.get(5)?,
        status: SessionStatus::parse(&status).unwrap_or(SessionStatus::Active),
        jsonl_path: row.get(7)?,
        summary_markdown: row.get(8)?,
        compact_markdown: row.get(9)?,
        git_branch: row.get(10)?,
        parent_session_id: row.get(11)?,
        agent_depth: row.get::<_, i64>(12)? as u32,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        transcript_processed: row.get::<_, i64>(15)? != 0,
    })
}

impl SessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Upsert a session on its identity tuple. Repeated calls return the
    /// same row id; non-null stored fields survive null inputs.
    pub fn register(
        &self,
        external_id: &str,
        machine_id: &str,
        source: SessionSource,
        project_id: &str,
        fields: RegisterSession,
    ) -> Result<Session, StorageError> {
        let now = utc_now_iso();
        let id = new_uuid();
        self.db.with_tx(|tx| {
            tx.execute(
                r#"
                INSERT INTO sessions (
                    id, external_id, machine_id, source, project_id, title, status,
                    jsonl_path, git_branch, parent_session_id, agent_depth,
                    created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7, ?8, ?9, ?10, ?11, ?11)
                ON CONFLICT (external_id, machine_id, source) DO UPDATE SET
                    project_id = excluded.project_id,
                    title = COALESCE(excluded.title, title),
                    jsonl_path = COALESCE(excluded.jsonl_path, jsonl_path),
                    git_branch = COALESCE(excluded.git_branch, git_branch),
                    parent_session_id = COALESCE(excluded.parent_session_id, parent_session_id),
                    updated_at = excluded.updated_at
                "#,
                params![
                    id,
                    external_id,
                    machine_id,
                    source.as_str(),
                    project_id,
                    fields.title,
                    fields.jsonl_path,
                    fields.git_branch,
                    fields.parent_session_id,
                    fields.agent_depth.unwrap_or(0) as i64,
                    now,
                ],
            )?;
            let session = tx.query_row(
                &format!(
                    "SELECT {COLS} FROM sessions \
                     WHERE external_id = ?1 AND machine_id = ?2 AND source = ?3"
                ),
                params![external_id, machine_id, source.as_str()],
                row_to_session,
            )?;
            Ok(session)
        })
    }

    pub fn get(&self, id: &str) -> Result<Session, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COLS} FROM sessions WHERE id = ?1"),
                params![id],
                row_to_session,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("session", id))
        })
    }

    pub fn get_by_identity(
        &self,
        external_id: &str,
        machine_id: &str,
        source: SessionSource,
    ) -> Result<Option<Session>, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {COLS} FROM sessions \
                         WHERE external_id = ?1 AND machine_id = ?2 AND source = ?3"
                    ),
                    params![external_id, machine_id, source.as_str()],
                    row_to_session,
                )
                .optional()?)
        })
    }

    pub fn set_status(&self, id: &str, status: SessionStatus) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE sessions SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), now],
            )?;
            if changed == 0 {
                return Err(StorageError::not_found("session", id));
            }
            Ok(())
        })
    }

    pub fn set_title(&self, id: &str, title: &str) -> Result<(), StorageError> {
        self.update_text_field(id, "title", Some(title))
    }

    pub fn set_summary(&self, id: &str, summary: &str) -> Result<(), StorageError> {
        self.update_text_field(id, "summary_markdown", Some(summary))
    }

    pub fn set_compact_markdown(&self, id: &str, markdown: &str) -> Result<(), StorageError> {
        self.update_text_field(id, "compact_markdown", Some(markdown))
    }

    fn update_text_field(
        &self,
        id: &str,
        column: &str,
        value: Option<&str>,
    ) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                &format!("UPDATE sessions SET {column} = ?2, updated_at = ?3 WHERE id = ?1"),
                params![id, value, now],
            )?;
            if changed == 0 {
                return Err(StorageError::not_found("session", id));
            }
            Ok(())
        })
    }

    pub fn set_transcript_processed(&self, id: &str, done: bool) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET transcript_processed = ?2 WHERE id = ?1",
                params![id, done as i64],
            )?;
            Ok(())
        })
    }

    /// Most-recently-updated session matching the handoff tuple.
    pub fn find_parent(
        &self,
        machine_id: &str,
        project_id: &str,
        source: SessionSource,
        status: SessionStatus,
    ) -> Result<Option<Session>, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {COLS} FROM sessions \
                         WHERE machine_id = ?1 AND project_id = ?2 AND source = ?3 \
                           AND status = ?4 \
                         ORDER BY updated_at DESC LIMIT 1"
                    ),
                    params![machine_id, project_id, source.as_str(), status.as_str()],
                    row_to_session,
                )
                .optional()?)
        })
    }

    pub fn list_by_project(&self, project_id: &str) -> Result<Vec<Session>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLS} FROM sessions WHERE project_id = ?1 ORDER BY updated_at DESC"
            ))?;
            let sessions = stmt
                .query_map(params![project_id], row_to_session)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
    }

    pub fn list_all(&self, limit: usize) -> Result<Vec<Session>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLS} FROM sessions ORDER BY updated_at DESC LIMIT ?1"
            ))?;
            let sessions = stmt
                .query_map(params![limit as i64], row_to_session)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
    }

    /// Depth of the ancestor chain above a session (0 for a root).
    ///
    /// Bounded to guard against parent cycles from corrupted rows.
    pub fn ancestor_depth(&self, id: &str) -> Result<u32, StorageError> {
        let mut depth = 0u32;
        let mut current = self.get(id)?;
        while let Some(parent_id) = current.parent_session_id.clone() {
            if depth >= 32 {
                break;
            }
            match self.get(&parent_id) {
                Ok(parent) => {
                    depth += 1;
                    current = parent;
                }
                Err(_) => break,
            }
        }
        Ok(depth)
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
