// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree store

use crate::{Database, StorageError};
use gobby_core::{utc_now_iso, Worktree, WorktreeId};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

#[derive(Clone)]
pub struct WorktreeStore {
    db: Arc<Database>,
}

const COLS: &str = "id, project_id, path, branch, status, created_at";

fn row_to_worktree(row: &Row) -> rusqlite::Result<Worktree> {
    let id: String = row.get(0)?;
    Ok(Worktree {
        id: WorktreeId::from_string(id),
        project_id: row.get(1)?,
        path: row.get(2)?,
        branch: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl WorktreeStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(
        &self,
        project_id: &str,
        path: &str,
        branch: &str,
    ) -> Result<Worktree, StorageError> {
        let id = WorktreeId::new();
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO worktrees (id, project_id, path, branch, status, created_at) \
                 VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
                params![id.as_str(), project_id, path, branch, now],
            )?;
            Ok(())
        })?;
        self.get(&id)
    }

    pub fn get(&self, id: &WorktreeId) -> Result<Worktree, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COLS} FROM worktrees WHERE id = ?1"),
                params![id.as_str()],
                row_to_worktree,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("worktree", id.as_str()))
        })
    }

    pub fn list_by_project(&self, project_id: &str) -> Result<Vec<Worktree>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLS} FROM worktrees WHERE project_id = ?1 ORDER BY created_at DESC"
            ))?;
            let worktrees = stmt
                .query_map(params![project_id], row_to_worktree)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(worktrees)
        })
    }

    pub fn set_status(&self, id: &WorktreeId, status: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE worktrees SET status = ?2 WHERE id = ?1",
                params![id.as_str(), status],
            )?;
            if changed == 0 {
                return Err(StorageError::not_found("worktree", id.as_str()));
            }
            Ok(())
        })
    }

    pub fn delete(&self, id: &WorktreeId) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM worktrees WHERE id = ?1", params![id.as_str()])?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "worktrees_tests.rs"]
mod tests;
