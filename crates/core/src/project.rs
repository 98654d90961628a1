// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project entity and on-disk sidecar
//!
//! One project per repository root. The only project-level on-disk state
//! outside the daemon home is `<repo>/.gobby/project.json`; worktrees
//! inherit it from the parent repo with `parent_project_path` set.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A stored project row. `id` is a UUIDv4 string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub repo_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The `.gobby/project.json` sidecar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSidecar {
    pub id: String,
    pub name: String,
    /// Set when the directory is a git worktree of another checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_project_path: Option<String>,
}

impl ProjectSidecar {
    /// Path of the sidecar file for a repository root.
    pub fn path_for(repo_root: &Path) -> PathBuf {
        repo_root.join(".gobby").join("project.json")
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
