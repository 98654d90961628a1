// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations

pub mod cron;
pub mod sessions;
pub mod tasks;

use crate::client::DaemonClient;
use crate::output;
use anyhow::Result;

pub async fn status(client: &DaemonClient, json: bool) -> Result<()> {
    let body = client.get("/api/status").await?;
    if json {
        output::emit(true, &body);
        return Ok(());
    }
    let uptime = body
        .get("uptime_seconds")
        .and_then(serde_json::Value::as_u64)
        .map(gobby_core::format_elapsed)
        .unwrap_or_else(|| "-".to_string());
    println!("status:         {}", output::field(&body, &["status"]));
    println!("uptime:         {uptime}");
    println!("running agents: {}", output::field(&body, &["running_agents"]));
    Ok(())
}
