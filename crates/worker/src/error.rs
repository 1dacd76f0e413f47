// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for the worker binary's run loop.

use thiserror::Error;
use tf_engine::ManagerError;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("task {0} has no checkpoint to work from")]
    NotFound(String),
    #[error("manager error: {0}")]
    Manager(#[from] ManagerError),
}
