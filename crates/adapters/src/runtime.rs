// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `AgentRuntime` seam: how a background task's prompt actually gets
//! executed, abstracted so the engine never talks to a real subprocess in
//! tests.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentRuntimeError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("agent exited with non-zero status: {0}")]
    NonZeroExit(String),
    #[error("could not parse agent output: {0}")]
    InvalidOutput(String),
}

/// Everything a runtime needs to execute one task attempt.
#[derive(Debug, Clone)]
pub struct AgentRunRequest {
    pub task_id: String,
    pub prompt: String,
    pub working_dir: PathBuf,
    /// Carried across retries so the underlying agent can pick up where it
    /// left off, if it supports that.
    pub resume_token: Option<String>,
    pub timeout: Duration,
    pub env: Vec<(String, String)>,
}

/// Outcome of one attempt at running a task's prompt.
#[derive(Debug, Clone)]
pub enum AgentRunOutcome {
    Completed {
        result: Option<Value>,
        logs: Vec<String>,
        resume_token: Option<String>,
    },
    Failed {
        error: String,
        logs: Vec<String>,
    },
}

/// Executes a background task's underlying work.
///
/// `WorkerProcess` tasks invoke this from the worker binary; `Inline` tasks
/// invoke it directly from the engine's own tokio runtime.
#[async_trait]
pub trait AgentRuntime: Send + Sync + 'static {
    async fn run(&self, request: AgentRunRequest) -> Result<AgentRunOutcome, AgentRuntimeError>;
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
