// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine crate.

use thiserror::Error;
use tf_adapters::AgentRuntimeError;
use tf_storage::CheckpointError;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("task {0} not found")]
    NotFound(String),
    #[error("task {0} is not revivable from its current status")]
    NotRevivable(String),
    #[error("task {0} is already terminal")]
    AlreadyTerminal(String),
    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("failed to spawn worker for task {task_id}: {message}")]
    SpawnFailed { task_id: String, message: String },
    #[error("agent runtime error: {0}")]
    Runtime(#[from] AgentRuntimeError),
    #[error("could not determine the write failed after {0} retries due to version conflicts")]
    TooManyConflicts(u32),
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("logical task ids must be unique within a stage; duplicate: {0}")]
    DuplicateTaskId(String),
    #[error("dependency cycle detected among tasks: {0:?}")]
    CycleDetected(Vec<String>),
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: String, dependency: String },
    #[error("planned files for tasks {a} and {b} overlap on {path}")]
    FileIsolationViolation { a: String, b: String, path: String },
    #[error("manager error: {0}")]
    Manager(#[from] ManagerError),
}
