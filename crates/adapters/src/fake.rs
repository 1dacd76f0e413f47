// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake agent runtime for deterministic testing.

use crate::runtime::{AgentRunOutcome, AgentRunRequest, AgentRuntime, AgentRuntimeError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A recorded call to [`FakeAgentRuntime::run`].
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub task_id: String,
    pub prompt: String,
    pub resume_token: Option<String>,
}

enum Scripted {
    Outcome(AgentRunOutcome),
    Error(String),
}

/// Fake [`AgentRuntime`] driven by a queue of scripted outcomes.
///
/// Calls beyond the end of the queue fall back to a default successful
/// outcome, so tests that don't care about the exact result can omit
/// scripting entirely.
#[derive(Clone)]
pub struct FakeAgentRuntime {
    inner: Arc<Mutex<FakeState>>,
}

struct FakeState {
    calls: Vec<RecordedRun>,
    scripted: VecDeque<Scripted>,
}

impl Default for FakeAgentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAgentRuntime {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                scripted: VecDeque::new(),
            })),
        }
    }

    /// Queue the outcome for the next `run` call.
    pub fn push_outcome(&self, outcome: AgentRunOutcome) {
        self.inner.lock().scripted.push_back(Scripted::Outcome(outcome));
    }

    /// Queue a runtime error for the next `run` call.
    pub fn push_error(&self, message: impl Into<String>) {
        self.inner
            .lock()
            .scripted
            .push_back(Scripted::Error(message.into()));
    }

    pub fn calls(&self) -> Vec<RecordedRun> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }
}

#[async_trait]
impl AgentRuntime for FakeAgentRuntime {
    async fn run(&self, request: AgentRunRequest) -> Result<AgentRunOutcome, AgentRuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RecordedRun {
            task_id: request.task_id.clone(),
            prompt: request.prompt.clone(),
            resume_token: request.resume_token.clone(),
        });

        match inner.scripted.pop_front() {
            Some(Scripted::Outcome(outcome)) => Ok(outcome),
            Some(Scripted::Error(message)) => Err(AgentRuntimeError::SpawnFailed(message)),
            None => Ok(AgentRunOutcome::Completed {
                result: Some(serde_json::json!({"ok": true})),
                logs: vec!["fake run completed".to_string()],
                resume_token: request.resume_token,
            }),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
