// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage and logical task descriptors (transient — never persisted).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single logical task within a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalTask {
    /// Stage-local identifier, unique within the owning [`Stage`].
    pub task_id: String,
    pub prompt: String,
    /// Paths this task may touch; used for the file-isolation precondition.
    #[serde(default)]
    pub planned_files: Vec<String>,
    #[serde(default)]
    pub acceptance: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Session this task's worker run is scoped to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,
}

impl LogicalTask {
    pub fn new(task_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            prompt: prompt.into(),
            planned_files: Vec::new(),
            acceptance: Vec::new(),
            depends_on: Vec::new(),
            max_retries: None,
            session_id: None,
            model: None,
            provider_type: None,
        }
    }

    pub fn planned_files(mut self, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.planned_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn depends_on(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn provider_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = Some(provider_type.into());
        self
    }
}

/// A declarative bundle of logical tasks executed as one barrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub stage_id: String,
    pub tasks: Vec<LogicalTask>,
}

impl Stage {
    pub fn new(stage_id: impl Into<String>, tasks: Vec<LogicalTask>) -> Self {
        Self {
            stage_id: stage_id.into(),
            tasks,
        }
    }
}

/// Status of a logical task within a running stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalTaskStatus {
    Waiting,
    Running,
    Completed,
    Error,
    Skipped,
}

impl LogicalTaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LogicalTaskStatus::Completed | LogicalTaskStatus::Error | LogicalTaskStatus::Skipped
        )
    }
}

/// Per-stage-run progress of one logical task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProgress {
    pub status: LogicalTaskStatus,
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at_ms: Option<u64>,
    /// Resume token carried across retries of this logical task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_token: Option<String>,
}

impl TaskProgress {
    pub fn waiting() -> Self {
        Self {
            status: LogicalTaskStatus::Waiting,
            attempt: 1,
            background_task_id: None,
            result: None,
            error: None,
            started_at_ms: None,
            ended_at_ms: None,
            resume_token: None,
        }
    }
}

/// A single recorded file change contributed by a completed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub added_lines: u32,
    pub removed_lines: u32,
    pub stage_id: String,
    pub task_id: String,
}

/// Structured result a worker reports on a clean finish, carried in
/// [`crate::Task::result`] and inspected by the Stage Scheduler for
/// silent-error detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerResult {
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub completed_files: Vec<String>,
    #[serde(default)]
    pub remaining_files: Vec<String>,
    #[serde(default)]
    pub file_changes: Vec<FileChange>,
    #[serde(default)]
    pub tool_events: u32,
    #[serde(default)]
    pub cost: f64,
}

/// Aggregate result of running one stage to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub all_success: bool,
    pub success_count: u32,
    pub fail_count: u32,
    pub retry_count: u32,
    pub completion_marker_seen: bool,
    pub task_progress: HashMap<String, TaskProgress>,
    pub file_changes: Vec<FileChange>,
    pub tool_events: u32,
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
