// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! External collaborator seams for the background task runtime: executing a
//! task's actual work via an [`AgentRuntime`].

pub mod env;
pub mod runtime;
pub mod shell;
pub mod subprocess;

pub use runtime::{AgentRunOutcome, AgentRunRequest, AgentRuntime, AgentRuntimeError};
pub use shell::ShellAgentRuntime;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeAgentRuntime, RecordedRun};
