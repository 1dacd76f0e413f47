// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tf-worker`: the process a `worker_process` background task's checkpoint
//! names. Spawned by the Background Manager with stdio redirected to null,
//! so it logs to its own file rather than stderr.

use std::path::PathBuf;
use std::sync::Arc;

use tf_adapters::ShellAgentRuntime;
use tf_core::{Config, SystemClock, TaskId};
use tf_engine::BackgroundManager;
use tf_worker::env;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let Some(task_id) = env::task_id(&args) else {
        eprintln!("tf-worker: no task id (set BGTASK_ID or pass it as argv[1])");
        std::process::exit(2);
    };
    let Some(runtime_dir) = env::runtime_dir() else {
        eprintln!("tf-worker: BGTASK_RUNTIME_DIR is required");
        std::process::exit(2);
    };
    let runtime_dir = PathBuf::from(runtime_dir);

    let _log_guard = setup_logging(&runtime_dir, &task_id);
    info!(task_id = %task_id, "worker starting");

    let config = match Config::load(&runtime_dir) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load config, using defaults");
            Config::default()
        }
    };

    let store = Arc::new(tf_storage::CheckpointStore::new(&runtime_dir));
    let agent_runtime: Arc<dyn tf_adapters::AgentRuntime> = Arc::new(ShellAgentRuntime::new());
    let manager = Arc::new(BackgroundManager::new(
        store,
        SystemClock,
        config,
        runtime_dir,
        // The worker never spawns further workers itself.
        PathBuf::from("tf-worker"),
        agent_runtime.clone(),
    ));

    let id = TaskId::new(task_id);
    match tf_worker::run_worker(manager, agent_runtime, SystemClock, id.clone()).await {
        Ok(()) => info!(task_id = %id, "worker finished"),
        Err(e) => {
            error!(task_id = %id, error = %e, "worker exited with an error");
            std::process::exit(1);
        }
    }
}

fn setup_logging(runtime_dir: &std::path::Path, task_id: &str) -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = runtime_dir.join("tasks");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::never(&log_dir, format!("{task_id}.worker.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    guard
}
