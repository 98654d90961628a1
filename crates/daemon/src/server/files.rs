// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project file browser
//!
//! Visibility follows git: tracked files plus untracked-but-not-ignored
//! ones (`git ls-files` + `--others --exclude-standard`). `.git/` never
//! appears in listings and writes under it are refused. Any path that
//! resolves outside the project root is a 403.

use super::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use gobby_adapters::subprocess::run_git;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub project_id: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Resolve the project root, then the requested path inside it.
///
/// Rejects absolute paths, parent traversal, and anything under `.git/`.
fn resolve_path(root: &Path, requested: Option<&str>) -> Result<PathBuf, ApiError> {
    let requested = requested.unwrap_or("");
    let rel = Path::new(requested);
    if rel.is_absolute() {
        return Err(ApiError::forbidden("absolute paths are not allowed"));
    }
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                if part == ".git" {
                    return Err(ApiError::forbidden(".git is not accessible"));
                }
            }
            Component::CurDir => {}
            _ => return Err(ApiError::forbidden("path traversal is not allowed")),
        }
    }
    let joined = root.join(rel);
    // Canonicalize what exists; for writes the parent must resolve.
    let check = if joined.exists() {
        joined.canonicalize()
    } else {
        match (joined.parent(), joined.file_name()) {
            (Some(parent), Some(name)) => parent.canonicalize().map(|c| c.join(name)),
            _ => joined.canonicalize(),
        }
    };
    let resolved = check.map_err(|e| ApiError::not_found(format!("path: {e}")))?;
    let root_canonical = root
        .canonicalize()
        .map_err(|e| ApiError::internal(format!("project root: {e}")))?;
    if !resolved.starts_with(&root_canonical) {
        return Err(ApiError::forbidden("path escapes project root"));
    }
    Ok(resolved)
}

fn project_root(state: &AppState, project_id: &str) -> Result<PathBuf, ApiError> {
    let project = state.projects.get(project_id)?;
    Ok(PathBuf::from(project.repo_path))
}

/// Paths git considers visible: tracked + untracked-not-ignored.
async fn visible_files(root: &Path) -> Result<BTreeSet<String>, ApiError> {
    let mut visible = BTreeSet::new();
    let tracked = run_git(root, &["ls-files"])
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    if tracked.success() {
        visible.extend(tracked.stdout.lines().map(str::to_string));
        let untracked = run_git(root, &["ls-files", "--others", "--exclude-standard"])
            .await
            .map_err(|e| ApiError::internal(e.to_string()))?;
        visible.extend(untracked.stdout.lines().map(str::to_string));
    } else {
        // Not a git repo: walk the directory instead.
        collect_plain(root, root, &mut visible);
    }
    Ok(visible)
}

fn collect_plain(root: &Path, dir: &Path, out: &mut BTreeSet<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.file_name().map(|n| n == ".git").unwrap_or(false) {
            continue;
        }
        if path.is_dir() {
            collect_plain(root, &path, out);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.insert(rel.to_string_lossy().to_string());
        }
    }
}

pub async fn projects(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let projects = state.projects.list()?;
    Ok(Json(json!({ "projects": projects })))
}

/// Directory listing: entries sorted directories-first, names
/// case-insensitive.
pub async fn tree(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    let root = project_root(&state, &query.project_id)?;
    let target = resolve_path(&root, query.path.as_deref())?;
    let visible = visible_files(&root).await?;

    let rel_prefix = target
        .strip_prefix(root.canonicalize().map_err(|e| ApiError::internal(e.to_string()))?)
        .unwrap_or(Path::new(""))
        .to_path_buf();

    let mut dirs: BTreeSet<String> = BTreeSet::new();
    let mut files: Vec<String> = Vec::new();
    for path in &visible {
        let path = Path::new(path);
        let Ok(rest) = path.strip_prefix(&rel_prefix) else {
            continue;
        };
        let mut components = rest.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => {
                files.push(name.to_string_lossy().to_string());
            }
            (Some(Component::Normal(name)), Some(_)) => {
                dirs.insert(name.to_string_lossy().to_string());
            }
            _ => {}
        }
    }

    let mut entries: Vec<Value> = Vec::new();
    let mut dir_names: Vec<String> = dirs.into_iter().collect();
    dir_names.sort_by_key(|n| n.to_lowercase());
    files.sort_by_key(|n| n.to_lowercase());
    for name in dir_names {
        entries.push(json!({"name": name, "type": "dir"}));
    }
    for name in files {
        entries.push(json!({"name": name, "type": "file"}));
    }
    Ok(Json(json!({ "entries": entries })))
}

pub async fn read(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    let root = project_root(&state, &query.project_id)?;
    let target = resolve_path(&root, query.path.as_deref())?;
    let content = tokio::fs::read_to_string(&target)
        .await
        .map_err(|e| ApiError::not_found(format!("read: {e}")))?;
    Ok(Json(json!({ "path": query.path, "content": content })))
}

pub async fn image(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<axum::response::Response, ApiError> {
    use axum::response::IntoResponse;
    let root = project_root(&state, &query.project_id)?;
    let target = resolve_path(&root, query.path.as_deref())?;
    let bytes = tokio::fs::read(&target)
        .await
        .map_err(|e| ApiError::not_found(format!("read: {e}")))?;
    let content_type = match target.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    };
    Ok(([(axum::http::header::CONTENT_TYPE, content_type)], bytes).into_response())
}

pub async fn git_status(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    let root = project_root(&state, &query.project_id)?;
    let output = run_git(&root, &["status", "--porcelain"])
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "status": output.stdout })))
}

pub async fn git_diff(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Value>, ApiError> {
    let root = project_root(&state, &query.project_id)?;
    let output = match query.path.as_deref() {
        Some(path) => {
            // The diff target obeys the same safety rules as reads.
            resolve_path(&root, Some(path))?;
            run_git(&root, &["diff", "--", path]).await
        }
        None => run_git(&root, &["diff"]).await,
    }
    .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "diff": output.stdout })))
}

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub project_id: String,
    pub path: String,
    pub content: String,
}

pub async fn write(
    State(state): State<AppState>,
    Json(request): Json<WriteRequest>,
) -> Result<Json<Value>, ApiError> {
    let root = project_root(&state, &request.project_id)?;
    let target = resolve_path(&root, Some(&request.path))?;
    tokio::fs::write(&target, request.content)
        .await
        .map_err(|e| ApiError::internal(format!("write: {e}")))?;
    Ok(Json(json!({ "written": request.path })))
}
