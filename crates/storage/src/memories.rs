// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Memory store
//!
//! Rows hold content and provenance; vector embeddings live in the
//! external store keyed by memory id. `content_exists` is the dedup
//! check used before every save.

use crate::{Database, StorageError};
use gobby_core::{new_uuid, utc_now_iso, Memory};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

#[derive(Clone)]
pub struct MemoryStore {
    db: Arc<Database>,
}

const COLS: &str =
    "id, project_id, content, memory_type, source_type, source_session_id, tags, created_at";

fn row_to_memory(row: &Row) -> rusqlite::Result<Memory> {
    let tags: String = row.get(6)?;
    Ok(Memory {
        id: row.get(0)?,
        project_id: row.get(1)?,
        content: row.get(2)?,
        memory_type: row.get(3)?,
        source_type: row.get(4)?,
        source_session_id: row.get(5)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        created_at: row.get(7)?,
    })
}

impl MemoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn save(
        &self,
        project_id: &str,
        content: &str,
        memory_type: &str,
        source_type: &str,
        source_session_id: Option<&str>,
        tags: &[String],
    ) -> Result<Memory, StorageError> {
        let id = new_uuid();
        let now = utc_now_iso();
        let tags_json = serde_json::to_string(tags)?;
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO memories (
                    id, project_id, content, memory_type, source_type,
                    source_session_id, tags, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![id, project_id, content, memory_type, source_type, source_session_id, tags_json, now],
            )?;
            Ok(())
        })?;
        self.get(&id)
    }

    pub fn get(&self, id: &str) -> Result<Memory, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COLS} FROM memories WHERE id = ?1"),
                params![id],
                row_to_memory,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("memory", id))
        })
    }

    /// Exact-content dedup check within a project.
    pub fn content_exists(&self, project_id: &str, content: &str) -> Result<bool, StorageError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM memories WHERE project_id = ?1 AND content = ?2",
                params![project_id, content],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn list_by_project(
        &self,
        project_id: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLS} FROM memories \
                 WHERE project_id = ?1 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let memories = stmt
                .query_map(params![project_id, limit as i64], row_to_memory)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(memories)
        })
    }

    /// Substring search fallback used when no vector store is wired.
    pub fn search_text(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Memory>, StorageError> {
        let pattern = format!("%{}%", query.replace('%', "\\%"));
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLS} FROM memories \
                 WHERE project_id = ?1 AND content LIKE ?2 ESCAPE '\\' \
                 ORDER BY created_at DESC LIMIT ?3"
            ))?;
            let memories = stmt
                .query_map(params![project_id, pattern, limit as i64], row_to_memory)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(memories)
        })
    }

    pub fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM memories WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(StorageError::not_found("memory", id));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "memories_tests.rs"]
mod tests;
