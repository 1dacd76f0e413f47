// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tf` — operator CLI for the background task runtime.
//!
//! A thin binary over [`tf_engine::BackgroundManager`], scoped to a single
//! runtime directory. No daemon, no socket: every invocation opens the
//! checkpoint store, does one thing, and exits.

mod color;
mod commands;
mod env;
mod table;

use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use tf_adapters::ShellAgentRuntime;
use tf_core::{Config, SystemClock};
use tf_engine::BackgroundManager;
use tf_storage::CheckpointStore;

#[derive(Parser)]
#[command(name = "tf", version, about = "Manage background tasks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tasks, most recently created last.
    List {
        /// Only show tasks with this status (pending, running, completed, cancelled, error, interrupted).
        #[arg(long)]
        status: Option<String>,
    },
    /// Show full detail for a single task.
    Show {
        /// Task id, or its bare suffix without the `bg_` prefix.
        id: String,
    },
    /// Cancel a task.
    Cancel {
        id: String,
    },
    /// Retry a task left in `error` or `interrupted` status.
    Retry {
        id: String,
    },
    /// Remove terminal tasks from the store.
    Clean {
        /// Only remove tasks that ended before this unix-epoch millisecond timestamp.
        #[arg(long)]
        before_ms: Option<u64>,
    },
    /// Run one reap + start-pending cycle.
    Tick,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let matches = Cli::command().styles(color::styles()).get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let runtime_dir = env::runtime_dir()?;
    std::fs::create_dir_all(&runtime_dir)?;

    let config = Config::load(&runtime_dir).unwrap_or_default();
    let store = Arc::new(CheckpointStore::new(&runtime_dir));
    let agent_runtime = Arc::new(ShellAgentRuntime::new());
    let manager = BackgroundManager::new(
        store,
        SystemClock,
        config,
        runtime_dir,
        env::worker_binary(),
        agent_runtime,
    );

    match cli.command {
        Command::List { status } => commands::list(&manager, status.as_deref()).await,
        Command::Show { id } => commands::show(&manager, &id).await,
        Command::Cancel { id } => commands::cancel(&manager, &id).await,
        Command::Retry { id } => commands::retry(&manager, &id).await,
        Command::Clean { before_ms } => commands::clean(&manager, before_ms).await,
        Command::Tick => commands::tick(&manager).await,
    }
}
