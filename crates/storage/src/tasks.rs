// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task store
//!
//! Tasks carry a per-project monotonic `seq_num` allocated inside the
//! insert transaction. References resolve from three shapes: `#N`,
//! dotted paths like `1.2.3`, and raw UUIDs. The dependency relation is
//! kept acyclic; `check_cycles` is the validator.

use crate::{Database, StorageError};
use gobby_core::{new_uuid, utc_now_iso, DepType, Task, TaskDependency, TaskStatus};
use rusqlite::{params, OptionalExtension, Row};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Fields for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub task_type: Option<String>,
    pub category: Option<String>,
    pub parent_task_id: Option<String>,
    pub validation_criteria: Option<String>,
    pub labels: Vec<String>,
}

/// Options for closing a task.
///
/// `uncommitted_tracked_changes` is the caller-observed git state; the
/// store itself never shells out.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloseOptions {
    pub no_commit_needed: bool,
    pub uncommitted_tracked_changes: bool,
}

#[derive(Clone)]
pub struct TaskStore {
    db: Arc<Database>,
}

const COLS: &str = "id, seq_num, project_id, title, description, status, priority, task_type, \
                    category, parent_task_id, commits, validation_criteria, validation_status, \
                    expansion_status, expansion_context, requires_user_review, labels, \
                    created_at, updated_at";

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let status: String = row.get(5)?;
    let commits: String = row.get(10)?;
    let labels: String = row.get(16)?;
    Ok(Task {
        id: row.get(0)?,
        seq_num: row.get(1)?,
        project_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: TaskStatus::parse(&status).unwrap_or(TaskStatus::Open),
        priority: row.get(6)?,
        task_type: row.get(7)?,
        category: row.get(8)?,
        parent_task_id: row.get(9)?,
        commits: serde_json::from_str(&commits).unwrap_or_default(),
        validation_criteria: row.get(11)?,
        validation_status: row.get(12)?,
        expansion_status: row.get(13)?,
        expansion_context: row.get(14)?,
        requires_user_review: row.get::<_, i64>(15)? != 0,
        labels: serde_json::from_str(&labels).unwrap_or_default(),
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

impl TaskStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a task, allocating the next `seq_num` for the project
    /// inside the same transaction.
    pub fn create(&self, project_id: &str, new: NewTask) -> Result<Task, StorageError> {
        if new.title.trim().is_empty() {
            return Err(StorageError::Validation("task title is required".to_string()));
        }
        let id = new_uuid();
        let now = utc_now_iso();
        let labels = serde_json::to_string(&new.labels)?;
        self.db.with_tx(|tx| {
            let seq_num: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq_num), 0) + 1 FROM tasks WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )?;
            tx.execute(
                r#"
                INSERT INTO tasks (
                    id, seq_num, project_id, title, description, status, priority,
                    task_type, category, parent_task_id, commits,
                    validation_criteria, labels, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, 'open', ?6, ?7, ?8, ?9, '[]', ?10, ?11, ?12, ?12)
                "#,
                params![
                    id,
                    seq_num,
                    project_id,
                    new.title,
                    new.description,
                    new.priority.unwrap_or_else(|| "medium".to_string()),
                    new.task_type.unwrap_or_else(|| "task".to_string()),
                    new.category,
                    new.parent_task_id,
                    new.validation_criteria,
                    labels,
                    now,
                ],
            )?;
            let task = tx.query_row(
                &format!("SELECT {COLS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )?;
            Ok(task)
        })
    }

    pub fn get(&self, id: &str) -> Result<Task, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COLS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?
            .ok_or_else(|| StorageError::TaskNotFound(id.to_string()))
        })
    }

    fn get_by_seq(&self, project_id: &str, seq_num: i64) -> Result<Task, StorageError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COLS} FROM tasks WHERE project_id = ?1 AND seq_num = ?2"),
                params![project_id, seq_num],
                row_to_task,
            )
            .optional()?
            .ok_or_else(|| StorageError::TaskNotFound(format!("#{seq_num}")))
        })
    }

    /// Resolve a task reference: `#N`, a dotted path `1.2.3` walking the
    /// parent chain by per-level ordinal, or a raw UUID. Everything else
    /// (including `gt-…` forms) is a `TaskNotFound` error.
    pub fn resolve_task_reference(
        &self,
        reference: &str,
        project_id: &str,
    ) -> Result<Task, StorageError> {
        let reference = reference.trim();
        if let Some(digits) = reference.strip_prefix('#') {
            let seq: i64 = digits
                .parse()
                .map_err(|_| StorageError::TaskNotFound(reference.to_string()))?;
            return self.get_by_seq(project_id, seq);
        }
        if looks_like_uuid(reference) {
            return self.get(reference);
        }
        if reference.contains('.')
            && reference.split('.').all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        {
            return self.resolve_dotted_path(reference, project_id);
        }
        Err(StorageError::TaskNotFound(reference.to_string()))
    }

    /// Walk a dotted path like `1.2.3`: each segment is a seq_num, and
    /// every task after the first must be a child of the previous one.
    fn resolve_dotted_path(&self, path: &str, project_id: &str) -> Result<Task, StorageError> {
        let mut current: Option<Task> = None;
        for part in path.split('.') {
            let seq: i64 = part
                .parse()
                .map_err(|_| StorageError::TaskNotFound(path.to_string()))?;
            let next = self
                .get_by_seq(project_id, seq)
                .map_err(|_| StorageError::TaskNotFound(path.to_string()))?;
            if let Some(parent) = &current {
                if next.parent_task_id.as_deref() != Some(parent.id.as_str()) {
                    return Err(StorageError::TaskNotFound(path.to_string()));
                }
            }
            current = Some(next);
        }
        current.ok_or_else(|| StorageError::TaskNotFound(path.to_string()))
    }

    pub fn children(&self, parent_task_id: &str) -> Result<Vec<Task>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLS} FROM tasks WHERE parent_task_id = ?1 ORDER BY seq_num"
            ))?;
            let tasks = stmt
                .query_map(params![parent_task_id], row_to_task)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    pub fn list_by_project(
        &self,
        project_id: &str,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, StorageError> {
        self.db.with_conn(|conn| {
            let tasks = match status {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {COLS} FROM tasks \
                         WHERE project_id = ?1 AND status = ?2 ORDER BY seq_num"
                    ))?;
                    let rows = stmt
                        .query_map(params![project_id, status.as_str()], row_to_task)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {COLS} FROM tasks WHERE project_id = ?1 ORDER BY seq_num"
                    ))?;
                    let rows = stmt
                        .query_map(params![project_id], row_to_task)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(tasks)
        })
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<(), StorageError> {
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), now],
            )?;
            if changed == 0 {
                return Err(StorageError::TaskNotFound(id.to_string()));
            }
            Ok(())
        })
    }

    pub fn link_commit(&self, id: &str, sha: &str) -> Result<(), StorageError> {
        let mut task = self.get(id)?;
        if !task.commits.iter().any(|c| c == sha) {
            task.commits.push(sha.to_string());
        }
        let commits = serde_json::to_string(&task.commits)?;
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET commits = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, commits, now],
            )?;
            Ok(())
        })
    }

    /// Close a task, enforcing the close invariants:
    /// open children block with `validation_failed`; missing commits
    /// need `no_commit_needed`, which in turn hard-blocks when tracked
    /// files still have changes.
    pub fn close(&self, id: &str, options: CloseOptions) -> Result<Task, StorageError> {
        let task = self.get(id)?;
        let open_children: Vec<String> = self
            .children(&task.id)?
            .into_iter()
            .filter(|child| !child.status.is_terminal())
            .map(|child| child.short_ref())
            .collect();
        if !open_children.is_empty() {
            return Err(StorageError::Validation(format!(
                "task {} has unclosed children: {}",
                task.short_ref(),
                open_children.join(", ")
            )));
        }
        if task.commits.is_empty() {
            if !options.no_commit_needed {
                return Err(StorageError::Validation(format!(
                    "task {} has no linked commits; pass no_commit_needed to close anyway",
                    task.short_ref()
                )));
            }
            if options.uncommitted_tracked_changes {
                return Err(StorageError::UncommittedChanges(format!(
                    "task {} claims no commit needed but tracked files have changes",
                    task.short_ref()
                )));
            }
        }
        self.set_status(id, TaskStatus::Closed)?;
        self.get(id)
    }

    // -- dependencies -------------------------------------------------------

    pub fn add_dependency(
        &self,
        task_id: &str,
        depends_on_task_id: &str,
        dep_type: DepType,
    ) -> Result<(), StorageError> {
        if task_id == depends_on_task_id {
            return Err(StorageError::Validation(
                "a task cannot depend on itself".to_string(),
            ));
        }
        // Both endpoints must exist.
        self.get(task_id)?;
        self.get(depends_on_task_id)?;
        let now = utc_now_iso();
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO task_dependencies (task_id, depends_on_task_id, dep_type, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (task_id, depends_on_task_id) DO UPDATE SET
                    dep_type = excluded.dep_type
                "#,
                params![task_id, depends_on_task_id, dep_type.as_str(), now],
            )?;
            Ok(())
        })
    }

    pub fn remove_dependency(
        &self,
        task_id: &str,
        depends_on_task_id: &str,
    ) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM task_dependencies \
                 WHERE task_id = ?1 AND depends_on_task_id = ?2",
                params![task_id, depends_on_task_id],
            )?;
            Ok(())
        })
    }

    pub fn dependencies_of(&self, task_id: &str) -> Result<Vec<TaskDependency>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT task_id, depends_on_task_id, dep_type, created_at \
                 FROM task_dependencies WHERE task_id = ?1",
            )?;
            let deps = stmt
                .query_map(params![task_id], |row| {
                    let dep_type: String = row.get(2)?;
                    Ok(TaskDependency {
                        task_id: row.get(0)?,
                        depends_on_task_id: row.get(1)?,
                        dep_type: DepType::parse(&dep_type).unwrap_or(DepType::Blocks),
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(deps)
        })
    }

    /// Detect cycles in the project's `blocks` dependency graph.
    ///
    /// Returns one task-id list per cycle found, empty when the graph is
    /// acyclic.
    pub fn check_cycles(&self, project_id: &str) -> Result<Vec<Vec<String>>, StorageError> {
        let edges: Vec<(String, String)> = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.task_id, d.depends_on_task_id
                 FROM task_dependencies d
                 JOIN tasks t ON t.id = d.task_id
                 WHERE t.project_id = ?1 AND d.dep_type = 'blocks'",
            )?;
            let edges = stmt
                .query_map(params![project_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(edges)
        })?;

        let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
        for (from, to) in &edges {
            graph.entry(from.as_str()).or_default().push(to.as_str());
        }

        fn dfs<'a>(
            node: &'a str,
            graph: &HashMap<&'a str, Vec<&'a str>>,
            path: &mut Vec<&'a str>,
            on_path: &mut HashSet<&'a str>,
            done: &mut HashSet<&'a str>,
            cycles: &mut Vec<Vec<String>>,
        ) {
            if done.contains(node) {
                return;
            }
            if on_path.contains(node) {
                let cycle_start = path.iter().position(|n| *n == node).unwrap_or(0);
                cycles.push(path[cycle_start..].iter().map(|s| s.to_string()).collect());
                return;
            }
            path.push(node);
            on_path.insert(node);
            if let Some(next) = graph.get(node) {
                for n in next {
                    dfs(n, graph, path, on_path, done, cycles);
                }
            }
            path.pop();
            on_path.remove(node);
            done.insert(node);
        }

        let mut cycles = Vec::new();
        let mut done: HashSet<&str> = HashSet::new();
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut starts: Vec<&str> = graph.keys().copied().collect();
        starts.sort_unstable();
        for start in starts {
            dfs(start, &graph, &mut path, &mut on_path, &mut done, &mut cycles);
        }
        Ok(cycles)
    }
}

fn looks_like_uuid(s: &str) -> bool {
    s.len() == 36
        && s.chars().enumerate().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
