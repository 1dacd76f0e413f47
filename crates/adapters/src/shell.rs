// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Real `AgentRuntime` that shells out to an external agent command.

use crate::env::agent_command;
use crate::runtime::{AgentRunOutcome, AgentRunRequest, AgentRuntime, AgentRuntimeError};
use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{instrument, warn};

/// Shells out to the command named by `BGTASK_AGENT_COMMAND` (default
/// `agent`), passing the prompt as its final argument and the task id /
/// resume token via environment variables. Stdout is parsed as JSON on
/// success; a non-zero exit status surfaces stderr as the failure reason.
pub struct ShellAgentRuntime {
    command: String,
}

impl ShellAgentRuntime {
    pub fn new() -> Self {
        Self {
            command: agent_command(),
        }
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for ShellAgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRuntime for ShellAgentRuntime {
    #[instrument(skip(self, request), fields(task_id = %request.task_id))]
    async fn run(&self, request: AgentRunRequest) -> Result<AgentRunOutcome, AgentRuntimeError> {
        let mut cmd = Command::new(&self.command);
        cmd.current_dir(&request.working_dir);
        cmd.arg(&request.prompt);
        cmd.env("BGTASK_ID", &request.task_id);
        if let Some(token) = &request.resume_token {
            cmd.env("BGTASK_RESUME_TOKEN", token);
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        let output = run_with_timeout(cmd, request.timeout, "agent run")
            .await
            .map_err(AgentRuntimeError::SpawnFailed)?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let logs: Vec<String> = stdout.lines().map(str::to_string).collect();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(status = ?output.status, "agent command exited non-zero");
            return Ok(AgentRunOutcome::Failed {
                error: if stderr.trim().is_empty() {
                    format!("agent exited with status {}", output.status)
                } else {
                    stderr
                },
                logs,
            });
        }

        let result = if stdout.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(stdout.trim())
                    .map_err(|e| AgentRuntimeError::InvalidOutput(e.to_string()))?,
            )
        };

        Ok(AgentRunOutcome::Completed {
            result,
            logs,
            resume_token: request.resume_token,
        })
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
