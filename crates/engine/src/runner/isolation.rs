// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Working-tree isolation for child agents
//!
//! `worktree` creates a git worktree off the base branch; `clone` makes
//! a separate working copy. Either way the child directory receives a
//! `.gobby/project.json` carrying `parent_project_path` so workflows in
//! the child can locate the parent repo. An existing sidecar is never
//! overwritten.

use crate::EngineError;
use gobby_adapters::subprocess::run_git;
use gobby_core::ProjectSidecar;
use gobby_storage::projects;
use std::path::Path;

/// Create a worktree at `dest` on a fresh `branch` cut from
/// `base_branch` (or HEAD when absent).
pub async fn create_worktree(
    repo: &Path,
    dest: &Path,
    branch: &str,
    base_branch: Option<&str>,
) -> Result<(), EngineError> {
    let dest_str = dest.to_string_lossy().to_string();
    let mut args = vec!["worktree", "add", "-b", branch, dest_str.as_str()];
    if let Some(base) = base_branch {
        args.push(base);
    }
    let output = run_git(repo, &args).await?;
    if !output.success() {
        return Err(EngineError::SpawnFailed(format!(
            "git worktree add failed: {}",
            output.stderr.trim()
        )));
    }
    Ok(())
}

/// Clone `repo` into `dest`.
pub async fn create_clone(repo: &Path, dest: &Path) -> Result<(), EngineError> {
    let repo_str = repo.to_string_lossy().to_string();
    let dest_str = dest.to_string_lossy().to_string();
    let output = run_git(repo, &["clone", repo_str.as_str(), dest_str.as_str()]).await?;
    if !output.success() {
        return Err(EngineError::SpawnFailed(format!(
            "git clone failed: {}",
            output.stderr.trim()
        )));
    }
    Ok(())
}

/// Write the child sidecar pointing back at the parent repo, unless one
/// already exists.
pub fn propagate_sidecar(
    parent_repo: &Path,
    child_dir: &Path,
    project_id: &str,
    project_name: &str,
) -> Result<(), EngineError> {
    let path = ProjectSidecar::path_for(child_dir);
    if path.exists() {
        return Ok(());
    }
    let sidecar = ProjectSidecar {
        id: project_id.to_string(),
        name: project_name.to_string(),
        parent_project_path: Some(parent_repo.to_string_lossy().to_string()),
    };
    projects::write_sidecar(&path, &sidecar)?;
    Ok(())
}

/// Remove a worktree registration and its directory.
pub async fn remove_worktree(repo: &Path, dest: &Path) -> Result<(), EngineError> {
    let dest_str = dest.to_string_lossy().to_string();
    let output = run_git(repo, &["worktree", "remove", "--force", dest_str.as_str()]).await?;
    if !output.success() {
        return Err(EngineError::SpawnFailed(format!(
            "git worktree remove failed: {}",
            output.stderr.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "isolation_tests.rs"]
mod tests;
