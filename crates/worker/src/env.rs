// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker binary.

/// Task id: `BGTASK_ID` env var, falling back to `argv[1]`.
pub fn task_id(args: &[String]) -> Option<String> {
    std::env::var("BGTASK_ID")
        .ok()
        .or_else(|| args.get(1).cloned())
}

/// Runtime directory the checkpoint store is rooted at.
pub fn runtime_dir() -> Option<String> {
    std::env::var("BGTASK_RUNTIME_DIR").ok()
}
