// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The checkpoint store: one durable JSON document per background task.
//!
//! Every write goes temp-file -> fsync -> rename -> fsync-dir so a crash
//! between steps never leaves a torn document on disk; readers always see
//! either the previous version or the fully-written next one.

use crate::io::{FsIoBackend, IoBackend};
use crate::CheckpointError;
use std::path::{Path, PathBuf};
use tf_core::{Task, TaskId};
use tracing::{debug, instrument};

const TASKS_DIR: &str = "tasks";
const JSON_EXT: &str = "json";

/// Durable per-task checkpoint storage rooted at a runtime directory.
pub struct CheckpointStore<B: IoBackend = FsIoBackend> {
    backend: B,
    tasks_dir: PathBuf,
}

impl CheckpointStore<FsIoBackend> {
    pub fn new(runtime_dir: impl AsRef<Path>) -> Self {
        Self::with_backend(FsIoBackend, runtime_dir)
    }
}

impl<B: IoBackend> CheckpointStore<B> {
    pub fn with_backend(backend: B, runtime_dir: impl AsRef<Path>) -> Self {
        Self {
            backend,
            tasks_dir: runtime_dir.as_ref().join(TASKS_DIR),
        }
    }

    fn task_path(&self, id: &TaskId) -> PathBuf {
        self.tasks_dir.join(format!("{}.{}", id.as_str(), JSON_EXT))
    }

    fn tmp_path(&self, id: &TaskId) -> PathBuf {
        self.tasks_dir.join(format!("{}.{}.tmp", id.as_str(), JSON_EXT))
    }

    /// Read a task's checkpoint, if it exists.
    #[instrument(skip(self), fields(task_id = %id))]
    pub fn read_task(&self, id: &TaskId) -> Result<Option<Task>, CheckpointError> {
        match self.backend.read(&self.task_path(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Durably write a task's checkpoint, replacing any prior document.
    #[instrument(skip(self, task), fields(task_id = %task.id, version = task.version))]
    pub fn write_task(&self, task: &Task) -> Result<(), CheckpointError> {
        self.backend.create_dir_all(&self.tasks_dir)?;
        let bytes = serde_json::to_vec_pretty(task)?;
        let tmp = self.tmp_path(&task.id);
        let dest = self.task_path(&task.id);
        self.backend.write_new(&tmp, &bytes)?;
        self.backend.fsync_file(&tmp)?;
        self.backend.rename(&tmp, &dest)?;
        self.backend.fsync_dir(&self.tasks_dir)?;
        debug!("wrote task checkpoint");
        Ok(())
    }

    /// List every task id with a checkpoint on disk, in no particular order.
    pub fn list_task_ids(&self) -> Result<Vec<TaskId>, CheckpointError> {
        Ok(self
            .backend
            .list_file_stems(&self.tasks_dir, JSON_EXT)?
            .into_iter()
            .map(TaskId::new)
            .collect())
    }

    /// Load every task checkpoint on disk.
    pub fn list_tasks(&self) -> Result<Vec<Task>, CheckpointError> {
        let mut tasks = Vec::new();
        for id in self.list_task_ids()? {
            if let Some(task) = self.read_task(&id)? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    /// Remove a task's checkpoint document entirely (used by `clean`).
    pub fn remove_task(&self, id: &TaskId) -> Result<(), CheckpointError> {
        self.backend.remove(&self.task_path(id))
    }

    /// Read-modify-write helper: append a log line and persist.
    pub fn append_log(&self, id: &TaskId, line: impl Into<String>) -> Result<Task, CheckpointError> {
        let mut task = self
            .read_task(id)?
            .ok_or_else(|| CheckpointError::NotFound(id.as_str().to_string()))?;
        task.push_log(line);
        self.write_task(&task)?;
        Ok(task)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
