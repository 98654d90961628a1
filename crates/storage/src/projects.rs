// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project store
//!
//! One project per repository root. `ensure` is the registration path:
//! it upserts the row and writes the `.gobby/project.json` sidecar,
//! honoring an existing sidecar (worktrees inherit the parent's without
//! overwriting).

use crate::{Database, StorageError};
use gobby_core::{new_uuid, utc_now_iso, Project, ProjectSidecar};
use rusqlite::{params, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProjectStore {
    db: Arc<Database>,
}

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        repo_path: row.get(2)?,
        github_url: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const COLS: &str = "id, name, repo_path, github_url, created_at, updated_at";

impl ProjectStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register (or fetch) the project for a repository root and write
    /// its sidecar if absent.
    pub fn ensure(&self, repo_path: &Path, name: &str) -> Result<Project, StorageError> {
        let sidecar_path = ProjectSidecar::path_for(repo_path);
        // An existing sidecar pins the project id; never overwrite it.
        let existing_sidecar: Option<ProjectSidecar> = std::fs::read_to_string(&sidecar_path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok());

        let repo = repo_path.to_string_lossy().to_string();
        let now = utc_now_iso();
        let id = existing_sidecar
            .as_ref()
            .map(|s| s.id.clone())
            .unwrap_or_else(new_uuid);

        let project = self.db.with_tx(|tx| {
            tx.execute(
                r#"
                INSERT INTO projects (id, name, repo_path, github_url, created_at, updated_at)
                VALUES (?1, ?2, ?3, NULL, ?4, ?4)
                ON CONFLICT (repo_path) DO UPDATE SET updated_at = excluded.updated_at
                "#,
                params![id, name, repo, now],
            )?;
            let project = tx
                .query_row(
                    &format!("SELECT {COLS} FROM projects WHERE repo_path = ?1"),
                    params![repo],
                    row_to_project,
                )?;
            Ok(project)
        })?;

        if existing_sidecar.is_none() {
            let sidecar = ProjectSidecar {
                id: project.id.clone(),
                name: project.name.clone(),
                parent_project_path: None,
            };
            write_sidecar(&sidecar_path, &sidecar)?;
        }
        Ok(project)
    }

    pub fn get(&self, id: &str) -> Result<Project, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COLS} FROM projects WHERE id = ?1"),
                params![id],
                row_to_project,
            )
            .optional()?
            .ok_or_else(|| StorageError::not_found("project", id))
        })
    }

    pub fn get_by_path(&self, repo_path: &Path) -> Result<Option<Project>, StorageError> {
        let repo = repo_path.to_string_lossy().to_string();
        self.db.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {COLS} FROM projects WHERE repo_path = ?1"),
                    params![repo],
                    row_to_project,
                )
                .optional()?)
        })
    }

    pub fn list(&self) -> Result<Vec<Project>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLS} FROM projects ORDER BY name"))?;
            let projects = stmt
                .query_map([], row_to_project)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(projects)
        })
    }
}

/// Write a sidecar file, creating `.gobby/` as needed.
pub fn write_sidecar(path: &Path, sidecar: &ProjectSidecar) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StorageError::Io(format!("create {}: {e}", parent.display())))?;
    }
    let text = serde_json::to_string_pretty(sidecar)?;
    std::fs::write(path, text)
        .map_err(|e| StorageError::Io(format!("write {}: {e}", path.display())))
}

/// Read the sidecar under a repository root, if present.
pub fn read_sidecar(repo_root: &Path) -> Option<ProjectSidecar> {
    let path = ProjectSidecar::path_for(repo_root);
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

#[cfg(test)]
#[path = "projects_tests.rs"]
mod tests;
