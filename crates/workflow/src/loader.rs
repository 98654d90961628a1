// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Definition loading with tier resolution
//!
//! Workflow and pipeline YAML files are discovered in three tiers —
//! bundled, user (`~/.gobby/{workflows,pipelines}`), and project
//! (`<repo>/.gobby/{workflows,pipelines}`) — with project definitions
//! shadowing user ones and user shadowing bundled. The loaded maps are
//! cached until `invalidate` is called.

use crate::definition::{parse_workflow, WorkflowDefinition};
use crate::pipeline_def::{parse_pipeline, PipelineDef};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Search tiers in ascending precedence order.
#[derive(Debug, Clone, Default)]
pub struct LoaderDirs {
    pub bundled: Option<PathBuf>,
    pub user: Option<PathBuf>,
    pub project: Option<PathBuf>,
}

impl LoaderDirs {
    fn ordered(&self) -> impl Iterator<Item = &Path> {
        [self.bundled.as_deref(), self.user.as_deref(), self.project.as_deref()]
            .into_iter()
            .flatten()
    }
}

/// Loads and caches workflow and pipeline definitions.
pub struct DefinitionLoader {
    workflow_dirs: LoaderDirs,
    pipeline_dirs: LoaderDirs,
    workflows: RwLock<Option<HashMap<String, WorkflowDefinition>>>,
    pipelines: RwLock<Option<HashMap<String, PipelineDef>>>,
}

impl DefinitionLoader {
    pub fn new(workflow_dirs: LoaderDirs, pipeline_dirs: LoaderDirs) -> Self {
        Self {
            workflow_dirs,
            pipeline_dirs,
            workflows: RwLock::new(None),
            pipelines: RwLock::new(None),
        }
    }

    /// All workflow definitions keyed by name, higher tiers shadowing.
    pub fn workflows(&self) -> HashMap<String, WorkflowDefinition> {
        if let Some(cached) = self.workflows.read().as_ref() {
            return cached.clone();
        }
        let loaded = load_tiered(&self.workflow_dirs, |text| {
            parse_workflow(text).map(|def| (def.name.clone(), def))
        });
        *self.workflows.write() = Some(loaded.clone());
        loaded
    }

    pub fn get_workflow(&self, name: &str) -> Option<WorkflowDefinition> {
        self.workflows().get(name).cloned()
    }

    /// All pipeline definitions keyed by name, higher tiers shadowing.
    pub fn pipelines(&self) -> HashMap<String, PipelineDef> {
        if let Some(cached) = self.pipelines.read().as_ref() {
            return cached.clone();
        }
        let loaded = load_tiered(&self.pipeline_dirs, |text| {
            parse_pipeline(text).map(|def| (def.name.clone(), def))
        });
        *self.pipelines.write() = Some(loaded.clone());
        loaded
    }

    pub fn get_pipeline(&self, name: &str) -> Option<PipelineDef> {
        self.pipelines().get(name).cloned()
    }

    /// Drop caches; the next access re-reads from disk.
    pub fn invalidate(&self) {
        *self.workflows.write() = None;
        *self.pipelines.write() = None;
    }
}

fn load_tiered<T>(
    dirs: &LoaderDirs,
    parse: impl Fn(&str) -> Result<(String, T), crate::WorkflowParseError>,
) -> HashMap<String, T> {
    let mut out = HashMap::new();
    for dir in dirs.ordered() {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();
        for path in paths {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read definition");
                    continue;
                }
            };
            match parse(&text) {
                // Later tiers overwrite earlier ones: project > user > bundled.
                Ok((name, def)) => {
                    out.insert(name, def);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping invalid definition");
                }
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
