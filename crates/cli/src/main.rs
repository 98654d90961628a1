// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gobby — CLI client for the Gobby daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gobby", about = "Coordinate AI coding assistant sessions", version)]
struct Cli {
    /// Daemon base URL.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8787")]
    daemon: String,

    /// Emit raw JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daemon status.
    Status,
    /// Cron job management.
    Cron {
        #[command(subcommand)]
        command: commands::cron::CronCommand,
    },
    /// Session queries.
    Sessions {
        #[command(subcommand)]
        command: commands::sessions::SessionsCommand,
    },
    /// Task queries and lifecycle.
    Tasks {
        #[command(subcommand)]
        command: commands::tasks::TasksCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = client::DaemonClient::new(cli.daemon.clone());
    let result = match cli.command {
        Command::Status => commands::status(&client, cli.json).await,
        Command::Cron { command } => commands::cron::run(&client, command, cli.json).await,
        Command::Sessions { command } => commands::sessions::run(&client, command, cli.json).await,
        Command::Tasks { command } => commands::tasks::run(&client, command, cli.json).await,
    };
    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("gobby: {e}");
            std::process::exit(1);
        }
    }
}
