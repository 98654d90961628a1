// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gobby tasks` subcommands

use crate::client::DaemonClient;
use crate::output;
use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

#[derive(Subcommand)]
pub enum TasksCommand {
    /// List tasks for a project.
    List {
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one task by #N, dotted path, or UUID.
    Show {
        reference: String,
        #[arg(long)]
        project_id: String,
    },
    /// Create a task.
    Add {
        title: String,
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Close a task.
    Close {
        reference: String,
        #[arg(long)]
        project_id: String,
        /// Allow closing without linked commits.
        #[arg(long)]
        no_commit_needed: bool,
    },
}

pub async fn run(client: &DaemonClient, command: TasksCommand, json: bool) -> Result<()> {
    match command {
        TasksCommand::List { project_id, status } => {
            let path = match status {
                Some(status) => {
                    format!("/api/tasks?project_id={project_id}&status={status}")
                }
                None => format!("/api/tasks?project_id={project_id}"),
            };
            let body = client.get(&path).await?;
            if json {
                output::emit(true, &body);
                return Ok(());
            }
            let rows: Vec<Vec<String>> = body["tasks"]
                .as_array()
                .map(|tasks| {
                    tasks
                        .iter()
                        .map(|t| {
                            vec![
                                format!("#{}", output::field(t, &["seq_num"])),
                                output::field(t, &["status"]),
                                output::field(t, &["priority"]),
                                output::field(t, &["title"]),
                            ]
                        })
                        .collect()
                })
                .unwrap_or_default();
            output::table(&["REF", "STATUS", "PRIORITY", "TITLE"], &rows);
            Ok(())
        }
        TasksCommand::Show { reference, project_id } => {
            let encoded = reference.replace('#', "%23");
            let body = client
                .get(&format!("/api/tasks/{encoded}?project_id={project_id}"))
                .await?;
            if json {
                output::emit(true, &body);
                return Ok(());
            }
            let task = &body["task"];
            for key in ["id", "seq_num", "title", "status", "priority", "parent_task_id"] {
                println!("{key:>15}: {}", output::field(task, &[key]));
            }
            Ok(())
        }
        TasksCommand::Add { title, project_id, parent, description } => {
            let body = client
                .post(
                    "/api/tasks",
                    json!({
                        "project_id": project_id,
                        "title": title,
                        "parent_task_id": parent,
                        "description": description,
                    }),
                )
                .await?;
            output::emit(json, &body);
            if !json {
                println!(
                    "created #{} {}",
                    output::field(&body, &["task", "seq_num"]),
                    output::field(&body, &["task", "title"])
                );
            }
            Ok(())
        }
        TasksCommand::Close { reference, project_id, no_commit_needed } => {
            let encoded = reference.replace('#', "%23");
            let body = client
                .post(
                    &format!("/api/tasks/{encoded}/close"),
                    json!({
                        "project_id": project_id,
                        "no_commit_needed": no_commit_needed,
                    }),
                )
                .await?;
            output::emit(json, &body);
            if !json {
                println!("closed #{}", output::field(&body, &["task", "seq_num"]));
            }
            Ok(())
        }
    }
}
