// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable background task record and its state machine.

use crate::id::TaskId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Maximum number of log lines retained in the in-document ring.
pub const MAX_LOG_LINES: usize = 300;

/// Status of a background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    Error,
    Interrupted,
}

impl TaskStatus {
    /// Terminal statuses end the task's lifecycle (absent `retry`).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Cancelled | TaskStatus::Error | TaskStatus::Interrupted
        )
    }

    /// Only `error` and `interrupted` may be revived by `retry`.
    pub fn is_revivable(&self) -> bool {
        matches!(self, TaskStatus::Error | TaskStatus::Interrupted)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Error => "error",
            TaskStatus::Interrupted => "interrupted",
        };
        write!(f, "{s}")
    }
}

/// How a task's work is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BackgroundMode {
    /// A detached child process drives the task; durable across manager restarts.
    WorkerProcess,
    /// The task runs as an in-process future. Not crash-safe: an inline task
    /// whose process dies loses its runnable, same as any other in-memory state.
    Inline,
}

impl fmt::Display for BackgroundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackgroundMode::WorkerProcess => write!(f, "worker_process"),
            BackgroundMode::Inline => write!(f, "inline"),
        }
    }
}

/// A background task's durable checkpoint document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    #[serde(default)]
    pub payload: HashMap<String, Value>,
    pub status: TaskStatus,
    pub background_mode: BackgroundMode,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_pid: Option<u32>,
    #[serde(default)]
    pub last_heartbeat_at_ms: u64,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default = "default_attempt")]
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_token: Option<String>,
    #[serde(rename = "_version", default = "default_version")]
    pub version: u64,
}

fn default_attempt() -> u32 {
    1
}

fn default_version() -> u64 {
    1
}

impl Task {
    /// Create a brand-new `pending` task.
    pub fn new(
        id: TaskId,
        description: impl Into<String>,
        payload: HashMap<String, Value>,
        background_mode: BackgroundMode,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            payload,
            status: TaskStatus::Pending,
            background_mode,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            started_at_ms: None,
            ended_at_ms: None,
            worker_pid: None,
            last_heartbeat_at_ms: 0,
            logs: Vec::new(),
            result: None,
            error: None,
            cancelled: false,
            attempt: 1,
            resume_token: None,
            version: 1,
        }
    }

    /// Append a log line, dropping the oldest entry once the ring is full.
    pub fn push_log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
        if self.logs.len() > MAX_LOG_LINES {
            let overflow = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(0..overflow);
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Read a string payload field, if present.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    /// Read a u64 payload field, if present.
    pub fn payload_u64(&self, key: &str) -> Option<u64> {
        self.payload.get(key).and_then(|v| v.as_u64())
    }
}

/// Builder for [`Task`] with test defaults.
#[cfg(any(test, feature = "test-support"))]
pub struct TaskBuilder {
    id: TaskId,
    description: String,
    payload: HashMap<String, Value>,
    status: TaskStatus,
    background_mode: BackgroundMode,
    created_at_ms: u64,
    updated_at_ms: u64,
    started_at_ms: Option<u64>,
    ended_at_ms: Option<u64>,
    worker_pid: Option<u32>,
    last_heartbeat_at_ms: u64,
    logs: Vec<String>,
    result: Option<Value>,
    error: Option<String>,
    cancelled: bool,
    attempt: u32,
    resume_token: Option<String>,
    version: u64,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for TaskBuilder {
    fn default() -> Self {
        Self {
            id: crate::id::new_task_id(),
            description: "test task".to_string(),
            payload: HashMap::new(),
            status: TaskStatus::Pending,
            background_mode: BackgroundMode::WorkerProcess,
            created_at_ms: 1_000_000,
            updated_at_ms: 1_000_000,
            started_at_ms: None,
            ended_at_ms: None,
            worker_pid: None,
            last_heartbeat_at_ms: 0,
            logs: Vec::new(),
            result: None,
            error: None,
            cancelled: false,
            attempt: 1,
            resume_token: None,
            version: 1,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl TaskBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = TaskId::new(id.into());
        self
    }
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }
    pub fn background_mode(mut self, mode: BackgroundMode) -> Self {
        self.background_mode = mode;
        self
    }
    pub fn worker_pid(mut self, pid: u32) -> Self {
        self.worker_pid = Some(pid);
        self
    }
    pub fn last_heartbeat_at_ms(mut self, ms: u64) -> Self {
        self.last_heartbeat_at_ms = ms;
        self
    }
    pub fn started_at_ms(mut self, ms: u64) -> Self {
        self.started_at_ms = Some(ms);
        self
    }
    pub fn created_at_ms(mut self, ms: u64) -> Self {
        self.created_at_ms = ms;
        self
    }
    pub fn payload(mut self, payload: HashMap<String, Value>) -> Self {
        self.payload = payload;
        self
    }
    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
    pub fn result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }
    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
    pub fn build(self) -> Task {
        Task {
            id: self.id,
            description: self.description,
            payload: self.payload,
            status: self.status,
            background_mode: self.background_mode,
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.updated_at_ms,
            started_at_ms: self.started_at_ms,
            ended_at_ms: self.ended_at_ms,
            worker_pid: self.worker_pid,
            last_heartbeat_at_ms: self.last_heartbeat_at_ms,
            logs: self.logs,
            result: self.result,
            error: self.error,
            cancelled: self.cancelled,
            attempt: self.attempt,
            resume_token: self.resume_token,
            version: self.version,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Task {
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
