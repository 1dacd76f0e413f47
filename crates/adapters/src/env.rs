// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

/// Command the shell runtime shells out to. Defaults to `"agent"` on PATH.
pub fn agent_command() -> String {
    std::env::var("BGTASK_AGENT_COMMAND").unwrap_or_else(|_| "agent".to_string())
}
