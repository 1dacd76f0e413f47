// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;

/// Resolve the runtime directory: `BGTASK_RUNTIME_DIR` > `XDG_STATE_HOME/tf` > `~/.local/state/tf`.
pub fn runtime_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var("BGTASK_RUNTIME_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("tf"));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("could not determine home directory"))?;
    Ok(home.join(".local/state/tf"))
}

/// Locate the `tf-worker` binary: override env var, then a sibling of the
/// running `tf` binary, then bare `tf-worker` resolved against `PATH`.
pub fn worker_binary() -> PathBuf {
    if let Ok(path) = std::env::var("BGTASK_WORKER_BINARY") {
        return PathBuf::from(path);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("tf-worker");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("tf-worker")
}
