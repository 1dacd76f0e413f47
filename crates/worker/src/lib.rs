// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The worker entry: the process a `worker_process` background task's
//! checkpoint names via `BGTASK_ID` / `BGTASK_RUNTIME_DIR`. It reads its own
//! task, heartbeats while the agent runtime runs the prompt, and honors
//! cooperative cancellation.

pub mod env;
pub mod error;

use error::WorkerError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tf_adapters::{AgentRunOutcome, AgentRunRequest, AgentRuntime};
use tf_core::{Clock, TaskId, TaskStatus};
use tf_engine::BackgroundManager;
use tracing::{info, instrument, warn};

/// Default worker timeout when neither the payload nor config supplies one.
const DEFAULT_WORKER_TIMEOUT_MS: u64 = 900_000;
/// Timeouts below this are clamped up, so a misconfigured value never spins
/// the heartbeat loop into a busy poll.
const MIN_WORKER_TIMEOUT_MS: u64 = 1_000;

/// Run one task attempt to completion: heartbeat, invoke the agent runtime,
/// honor cancellation, and patch the final outcome.
#[instrument(skip(manager, agent_runtime, clock), fields(task_id = %id))]
pub async fn run_worker<C: Clock>(
    manager: Arc<BackgroundManager<C>>,
    agent_runtime: Arc<dyn AgentRuntime>,
    clock: C,
    id: TaskId,
) -> Result<(), WorkerError> {
    let task = manager
        .get(&id)?
        .ok_or_else(|| WorkerError::NotFound(id.to_string()))?;

    let timeout_ms = task
        .payload_u64("worker_timeout_ms")
        .unwrap_or(DEFAULT_WORKER_TIMEOUT_MS)
        .max(MIN_WORKER_TIMEOUT_MS);
    let heartbeat_interval = Duration::from_millis((timeout_ms / 3).max(1));

    let working_dir = task
        .payload_str("cwd")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let prompt = task.payload_str("prompt").unwrap_or_default().to_string();

    let request = AgentRunRequest {
        task_id: id.to_string(),
        prompt,
        working_dir,
        resume_token: task.resume_token.clone(),
        timeout: Duration::from_millis(timeout_ms),
        env: Vec::new(),
    };

    let run_fut = agent_runtime.run(request);
    tokio::pin!(run_fut);
    let mut ticker = tokio::time::interval(heartbeat_interval);
    ticker.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            outcome = &mut run_fut => {
                return finish(&manager, &clock, &id, outcome).await;
            }
            _ = ticker.tick() => {
                if heartbeat_and_check_cancelled(&manager, &clock, &id).await? {
                    return Ok(());
                }
            }
        }
    }
}

async fn heartbeat_and_check_cancelled<C: Clock>(
    manager: &BackgroundManager<C>,
    clock: &C,
    id: &TaskId,
) -> Result<bool, WorkerError> {
    let now = clock.epoch_ms();
    let task = manager
        .patch_task(id, move |t| {
            t.last_heartbeat_at_ms = now;
            Ok(())
        })
        .await?;

    if task.cancelled {
        info!(task_id = %id, "observed cancellation request, finishing promptly");
        manager
            .patch_task(id, move |t| {
                t.status = TaskStatus::Cancelled;
                t.ended_at_ms = Some(now);
                Ok(())
            })
            .await?;
        return Ok(true);
    }
    Ok(false)
}

async fn finish<C: Clock>(
    manager: &BackgroundManager<C>,
    clock: &C,
    id: &TaskId,
    outcome: Result<AgentRunOutcome, tf_adapters::AgentRuntimeError>,
) -> Result<(), WorkerError> {
    let now = clock.epoch_ms();
    match outcome {
        Ok(AgentRunOutcome::Completed {
            result,
            logs,
            resume_token,
        }) => {
            manager
                .patch_task(id, move |t| {
                    t.status = TaskStatus::Completed;
                    t.ended_at_ms = Some(now);
                    t.result = result.clone();
                    t.resume_token = resume_token.clone();
                    for line in &logs {
                        t.push_log(line.clone());
                    }
                    Ok(())
                })
                .await?;
        }
        Ok(AgentRunOutcome::Failed { error, logs }) => {
            warn!(task_id = %id, error = %error, "agent run failed");
            manager
                .patch_task(id, move |t| {
                    t.status = TaskStatus::Error;
                    t.ended_at_ms = Some(now);
                    t.error = Some(error.clone());
                    for line in &logs {
                        t.push_log(line.clone());
                    }
                    Ok(())
                })
                .await?;
        }
        Err(e) => {
            warn!(task_id = %id, error = %e, "agent runtime error");
            manager
                .patch_task(id, move |t| {
                    t.status = TaskStatus::Error;
                    t.ended_at_ms = Some(now);
                    t.error = Some(e.to_string());
                    Ok(())
                })
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
