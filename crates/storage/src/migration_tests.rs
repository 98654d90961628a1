// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{Database, StorageError};

#[test]
fn migrations_are_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let v1 = db.schema_version().unwrap();
    // Re-running against an already-migrated connection is a no-op.
    db.with_conn(super::run).unwrap();
    assert_eq!(db.schema_version().unwrap(), v1);
}

#[test]
fn reopening_a_database_preserves_data() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("gobby.db");
    {
        let db = Database::open(&path).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, name, repo_path, created_at, updated_at) \
                 VALUES ('p1', 'demo', '/r', 't', 't')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
    }
    let db = Database::open(&path).unwrap();
    let count: i64 = db
        .with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?)
        })
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn all_expected_tables_exist() {
    let db = Database::open_in_memory().unwrap();
    let tables: Vec<String> = db
        .with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()
                .map_err(StorageError::from)?;
            Ok(names)
        })
        .unwrap();
    for expected in [
        "projects",
        "sessions",
        "messages",
        "tasks",
        "task_dependencies",
        "workflow_states",
        "pipeline_executions",
        "step_executions",
        "cron_jobs",
        "cron_runs",
        "memories",
        "prompts",
        "mcp_servers",
        "worktrees",
        "agents",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
    }
}
