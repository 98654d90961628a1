// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt store
//!
//! Prompts are unique on `(path, tier, project_id)`. `resolve` returns
//! the highest-precedence row for a path: project > user > bundled.

use crate::{Database, StorageError};
use gobby_core::{new_uuid, utc_now_iso, Prompt, PromptTier};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

#[derive(Clone)]
pub struct PromptStore {
    db: Arc<Database>,
}

const COLS: &str = "id, path, tier, project_id, name, description, version, category, content, \
                    variables, source_file, created_at, updated_at";

fn row_to_prompt(row: &Row) -> rusqlite::Result<Prompt> {
    let tier: String = row.get(2)?;
    Ok(Prompt {
        id: row.get(0)?,
        path: row.get(1)?,
        tier: PromptTier::parse(&tier).unwrap_or(PromptTier::Bundled),
        project_id: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        version: row.get(6)?,
        category: row.get(7)?,
        content: row.get(8)?,
        variables: row.get(9)?,
        source_file: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

impl PromptStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or replace the prompt at `(path, tier, project_id)`.
    pub fn upsert(
        &self,
        path: &str,
        tier: PromptTier,
        project_id: Option<&str>,
        name: Option<&str>,
        description: &str,
        category: &str,
        content: &str,
    ) -> Result<Prompt, StorageError> {
        let id = new_uuid();
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO prompts (
                    id, path, tier, project_id, name, description, category,
                    content, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                ON CONFLICT (path, tier, coalesce(project_id, '')) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    category = excluded.category,
                    content = excluded.content,
                    updated_at = excluded.updated_at
                "#,
                params![id, path, tier.as_str(), project_id, name, description, category, content, now],
            )?;
            Ok(())
        })?;
        self.get_exact(path, tier, project_id)?
            .ok_or_else(|| StorageError::not_found("prompt", path))
    }

    pub fn get_exact(
        &self,
        path: &str,
        tier: PromptTier,
        project_id: Option<&str>,
    ) -> Result<Option<Prompt>, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {COLS} FROM prompts \
                         WHERE path = ?1 AND tier = ?2 AND coalesce(project_id, '') = ?3"
                    ),
                    params![path, tier.as_str(), project_id.unwrap_or("")],
                    row_to_prompt,
                )
                .optional()?)
        })
    }

    /// Resolve a path to its effective prompt: project > user > bundled.
    pub fn resolve(&self, path: &str, project_id: Option<&str>) -> Result<Option<Prompt>, StorageError> {
        if let Some(project_id) = project_id {
            if let Some(p) =
                self.get_exact(path, PromptTier::Project, Some(project_id))?
            {
                return Ok(Some(p));
            }
        }
        if let Some(p) = self.get_exact(path, PromptTier::User, None)? {
            return Ok(Some(p));
        }
        self.get_exact(path, PromptTier::Bundled, None)
    }

    pub fn list(&self, project_id: Option<&str>) -> Result<Vec<Prompt>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLS} FROM prompts \
                 WHERE project_id IS NULL OR project_id = ?1 \
                 ORDER BY path, tier"
            ))?;
            let prompts = stmt
                .query_map(params![project_id.unwrap_or("")], row_to_prompt)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(prompts)
        })
    }
}

#[cfg(test)]
#[path = "prompts_tests.rs"]
mod tests;
