// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gobby sessions` subcommands

use crate::client::DaemonClient;
use crate::output;
use anyhow::Result;
use clap::Subcommand;
use serde_json::Value;

#[derive(Subcommand)]
pub enum SessionsCommand {
    /// List recent sessions.
    List {
        #[arg(long)]
        project_id: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show one session.
    Show { id: String },
}

pub async fn run(client: &DaemonClient, command: SessionsCommand, json: bool) -> Result<()> {
    match command {
        SessionsCommand::List { project_id, limit } => {
            let path = match project_id {
                Some(project_id) => {
                    format!("/api/sessions?project_id={project_id}&limit={limit}")
                }
                None => format!("/api/sessions?limit={limit}"),
            };
            let body = client.get(&path).await?;
            if json {
                output::emit(true, &body);
                return Ok(());
            }
            let rows: Vec<Vec<String>> = body["sessions"]
                .as_array()
                .map(|sessions| {
                    sessions
                        .iter()
                        .map(|s| {
                            vec![
                                gobby_core::short(&output::field(s, &["id"]), 8).to_string(),
                                output::field(s, &["source"]),
                                output::field(s, &["status"]),
                                output::field(s, &["title"]),
                                output::field(s, &["updated_at"]),
                            ]
                        })
                        .collect()
                })
                .unwrap_or_default();
            output::table(&["ID", "SOURCE", "STATUS", "TITLE", "UPDATED"], &rows);
            Ok(())
        }
        SessionsCommand::Show { id } => {
            let body = client.get(&format!("/api/sessions/{id}")).await?;
            if json {
                output::emit(true, &body);
                return Ok(());
            }
            let session = &body["session"];
            for key in [
                "id",
                "external_id",
                "source",
                "status",
                "title",
                "parent_session_id",
                "agent_depth",
                "created_at",
                "updated_at",
            ] {
                println!("{key:>18}: {}", output::field(session, &[key]));
            }
            if session.get("summary_markdown").and_then(Value::as_str).is_some() {
                println!("\n{}", output::field(session, &["summary_markdown"]));
            }
            Ok(())
        }
    }
}
