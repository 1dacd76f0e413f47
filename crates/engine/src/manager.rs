// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Background Manager: launches, reaps, and revives background tasks.
//!
//! Every mutation goes through [`BackgroundManager::patch_task`], which
//! re-reads the checkpoint before writing so a stale in-memory view never
//! clobbers a concurrent writer (the worker process updating its own
//! heartbeat, most commonly). The per-id async lock only serializes
//! attempts from within this process; the version re-read is what protects
//! against the worker process racing the manager.

use nix::sys::signal::kill;
use nix::unistd::Pid;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tf_adapters::{AgentRunOutcome, AgentRunRequest, AgentRuntime};
use tf_core::{
    new_resume_token, new_task_id, BackgroundMode, Clock, Config, SystemClock, Task, TaskId,
    TaskStatus,
};
use tf_storage::CheckpointStore;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ManagerError;

const MAX_PATCH_RETRIES: u32 = 3;

/// Grace added on top of a task's resolved timeout before the reaper
/// treats it as stale, absorbing scheduling jitter between the worker's
/// heartbeat writes and the reaper's poll.
const STALE_GRACE_MS: u64 = 5000;

/// Per-task timeouts below this are clamped up, so a misconfigured
/// near-zero `worker_timeout_ms` cannot make the reaper starve a task
/// before its worker has even had a chance to heartbeat.
const MIN_WORKER_TIMEOUT_MS: u64 = 1000;

/// Orchestrates the lifecycle of background tasks against a [`CheckpointStore`].
pub struct BackgroundManager<C: Clock = SystemClock> {
    store: Arc<CheckpointStore>,
    clock: C,
    config: Config,
    runtime_dir: PathBuf,
    worker_binary: PathBuf,
    agent_runtime: Arc<dyn AgentRuntime>,
    locks: SyncMutex<HashMap<TaskId, Arc<AsyncMutex<()>>>>,
}

impl<C: Clock> BackgroundManager<C> {
    pub fn new(
        store: Arc<CheckpointStore>,
        clock: C,
        config: Config,
        runtime_dir: PathBuf,
        worker_binary: PathBuf,
        agent_runtime: Arc<dyn AgentRuntime>,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            runtime_dir,
            worker_binary,
            agent_runtime,
            locks: SyncMutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, id: &TaskId) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Create a new `pending` task and persist it immediately.
    #[instrument(skip(self, payload))]
    pub fn launch(
        &self,
        description: impl Into<String>,
        payload: HashMap<String, serde_json::Value>,
        background_mode: BackgroundMode,
    ) -> Result<Task, ManagerError> {
        let id = new_task_id();
        let now = self.clock.epoch_ms();
        let task = Task::new(id, description, payload, background_mode, now);
        self.store.write_task(&task)?;
        info!(task_id = %task.id, "launched task");
        Ok(task)
    }

    /// Convenience over [`Self::launch`] for tasks delegated to a worker
    /// agent: stamps `payload.worker_type = "delegate_task"` and mints the
    /// task a fresh `resume_token` up front, so its first attempt already
    /// carries one.
    #[instrument(skip(self, payload))]
    pub fn launch_delegate_task(
        &self,
        description: impl Into<String>,
        mut payload: HashMap<String, serde_json::Value>,
        background_mode: BackgroundMode,
    ) -> Result<Task, ManagerError> {
        payload.insert(
            "worker_type".to_string(),
            serde_json::Value::String("delegate_task".to_string()),
        );
        let id = new_task_id();
        let now = self.clock.epoch_ms();
        let mut task = Task::new(id, description, payload, background_mode, now);
        task.resume_token = Some(new_resume_token());
        self.store.write_task(&task)?;
        info!(task_id = %task.id, "launched delegate task");
        Ok(task)
    }

    pub fn get(&self, id: &TaskId) -> Result<Option<Task>, ManagerError> {
        Ok(self.store.read_task(id)?)
    }

    pub fn list(&self) -> Result<Vec<Task>, ManagerError> {
        Ok(self.store.list_tasks()?)
    }

    /// Mark a task cancelled. Terminal tasks cannot be cancelled again.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: &TaskId) -> Result<Task, ManagerError> {
        let now = self.clock.epoch_ms();
        self.patch_task(id, move |task| {
            if task.is_terminal() {
                return Err(ManagerError::AlreadyTerminal(task.id.to_string()));
            }
            task.cancelled = true;
            task.status = TaskStatus::Cancelled;
            task.ended_at_ms = Some(now);
            Ok(())
        })
        .await
    }

    /// Revive an `error` or `interrupted` task back to `pending`, rotating
    /// its resume token so the underlying agent run can be distinguished
    /// from the previous attempt.
    #[instrument(skip(self))]
    pub async fn retry(&self, id: &TaskId) -> Result<Task, ManagerError> {
        let now = self.clock.epoch_ms();
        self.patch_task(id, move |task| {
            if !task.status.is_revivable() {
                return Err(ManagerError::NotRevivable(task.id.to_string()));
            }
            task.status = TaskStatus::Pending;
            task.attempt += 1;
            task.error = None;
            task.worker_pid = None;
            task.started_at_ms = None;
            task.ended_at_ms = None;
            task.last_heartbeat_at_ms = 0;
            task.resume_token = Some(new_resume_token());
            Ok(())
        })
        .await
    }

    /// Remove checkpoints for terminal tasks. When `before_ms` is set, only
    /// tasks last updated before that time are removed.
    pub fn clean(&self, before_ms: Option<u64>) -> Result<Vec<TaskId>, ManagerError> {
        let mut removed = Vec::new();
        for task in self.store.list_tasks()? {
            if !task.is_terminal() {
                continue;
            }
            if let Some(cutoff) = before_ms {
                if task.updated_at_ms >= cutoff {
                    continue;
                }
            }
            self.store.remove_task(&task.id)?;
            removed.push(task.id);
        }
        Ok(removed)
    }

    /// Apply a mutation to a task, retrying on version conflicts.
    ///
    /// `mutate` receives the freshly-read task and may return an error to
    /// abort the patch without writing anything.
    pub async fn patch_task<F>(&self, id: &TaskId, mut mutate: F) -> Result<Task, ManagerError>
    where
        F: FnMut(&mut Task) -> Result<(), ManagerError> + Send,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        for _ in 0..MAX_PATCH_RETRIES {
            let mut task = self
                .store
                .read_task(id)?
                .ok_or_else(|| ManagerError::NotFound(id.as_str().to_string()))?;
            let expected_version = task.version;

            mutate(&mut task)?;
            task.version = expected_version + 1;
            task.updated_at_ms = self.clock.epoch_ms();

            let current = self
                .store
                .read_task(id)?
                .ok_or_else(|| ManagerError::NotFound(id.as_str().to_string()))?;
            if current.version != expected_version {
                debug!(task_id = %id, "version conflict, retrying patch");
                continue;
            }

            self.store.write_task(&task)?;
            return Ok(task);
        }

        Err(ManagerError::TooManyConflicts(MAX_PATCH_RETRIES))
    }

    /// Reap `running` tasks whose worker process died or stopped
    /// heartbeating, transitioning them to `interrupted`.
    #[instrument(skip(self))]
    pub async fn reap_stale_tasks(&self) -> Result<usize, ManagerError> {
        let now = self.clock.epoch_ms();
        let mut reaped = 0;
        for task in self.store.list_tasks()? {
            if task.status != TaskStatus::Running {
                continue;
            }
            if !self.is_stale(&task, now) {
                continue;
            }
            let id = task.id.clone();
            match self
                .patch_task(&id, move |task| {
                    if task.status == TaskStatus::Running {
                        task.status = TaskStatus::Interrupted;
                        task.ended_at_ms = Some(now);
                        task.error = Some("worker heartbeat lost".to_string());
                    }
                    Ok(())
                })
                .await
            {
                Ok(_) => {
                    warn!(task_id = %id, "reaped stale running task");
                    reaped += 1;
                }
                Err(e) => error!(task_id = %id, error = %e, "failed to reap stale task"),
            }
        }
        Ok(reaped)
    }

    fn is_stale(&self, task: &Task, now: u64) -> bool {
        let worker_timeout_ms = task
            .payload_u64("worker_timeout_ms")
            .unwrap_or(self.config.background_worker_timeout_ms)
            .max(MIN_WORKER_TIMEOUT_MS);
        let threshold = worker_timeout_ms + STALE_GRACE_MS;

        let stale_by_heartbeat =
            task.last_heartbeat_at_ms > 0 && now.saturating_sub(task.last_heartbeat_at_ms) > threshold;
        let stale_no_heartbeat = task.last_heartbeat_at_ms == 0 && {
            let reference = task.started_at_ms.unwrap_or(task.created_at_ms);
            now.saturating_sub(reference) > threshold
        };
        let dead_pid = matches!(task.background_mode, BackgroundMode::WorkerProcess)
            && task
                .worker_pid
                .map(|pid| !pid_alive(pid))
                .unwrap_or(false);

        stale_by_heartbeat || stale_no_heartbeat || dead_pid
    }

    /// Promote `pending` tasks to `running`, up to the configured
    /// parallelism cap, and start their worker.
    #[instrument(skip(self))]
    pub async fn start_pending_tasks(&self) -> Result<usize, ManagerError> {
        let tasks = self.store.list_tasks()?;
        let running_count = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Running)
            .count();
        let available = (self.config.background_max_parallel as usize).saturating_sub(running_count);
        if available == 0 {
            return Ok(0);
        }

        let mut pending: Vec<Task> = tasks
            .into_iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect();
        pending.sort_by_key(|t| t.created_at_ms);
        pending.truncate(available);

        let mut started = 0;
        for task in pending {
            let now = self.clock.epoch_ms();
            let id = task.id.clone();
            let default_timeout_ms = self.config.background_worker_timeout_ms;
            let promoted = self
                .patch_task(&id, move |task| {
                    task.status = TaskStatus::Running;
                    task.started_at_ms = Some(now);
                    task.last_heartbeat_at_ms = now;
                    let resolved_timeout_ms = task
                        .payload_u64("worker_timeout_ms")
                        .unwrap_or(default_timeout_ms)
                        .max(MIN_WORKER_TIMEOUT_MS);
                    task.payload.insert(
                        "worker_timeout_ms".to_string(),
                        serde_json::Value::from(resolved_timeout_ms),
                    );
                    Ok(())
                })
                .await?;

            if let Err(e) = self.spawn_worker(&promoted).await {
                let message = e.to_string();
                warn!(task_id = %id, error = %message, "spawn failed, marking task errored");
                self.patch_task(&id, move |task| {
                    if task.status == TaskStatus::Running {
                        task.status = TaskStatus::Error;
                        task.ended_at_ms = Some(now);
                        task.error = Some(format!("spawn failed: {message}"));
                    }
                    Ok(())
                })
                .await?;
                continue;
            }
            started += 1;
        }
        Ok(started)
    }

    /// Start the worker for a `running` task: a detached child process for
    /// `worker_process` tasks, or an in-process future for `inline` tasks.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn spawn_worker(&self, task: &Task) -> Result<(), ManagerError> {
        match task.background_mode {
            BackgroundMode::WorkerProcess => {
                let mut cmd = tokio::process::Command::new(&self.worker_binary);
                cmd.env("BGTASK_ID", task.id.as_str());
                cmd.env("BGTASK_RUNTIME_DIR", &self.runtime_dir);
                cmd.stdin(std::process::Stdio::null());
                cmd.stdout(std::process::Stdio::null());
                cmd.stderr(std::process::Stdio::null());

                let child = cmd.spawn().map_err(|e| ManagerError::SpawnFailed {
                    task_id: task.id.to_string(),
                    message: e.to_string(),
                })?;
                if let Some(pid) = child.id() {
                    let id = task.id.clone();
                    self.patch_task(&id, move |task| {
                        task.worker_pid = Some(pid);
                        Ok(())
                    })
                    .await?;
                }
                // tokio's Child does not kill on drop unless asked to, so
                // dropping the handle here simply stops waiting on it — the
                // worker process keeps running and checkpoints itself.
                drop(child);
                Ok(())
            }
            BackgroundMode::Inline => {
                let runtime = self.agent_runtime.clone();
                let prompt = task.payload_str("prompt").unwrap_or_default().to_string();
                let worker_timeout_ms = task
                    .payload_u64("worker_timeout_ms")
                    .unwrap_or(self.config.background_worker_timeout_ms)
                    .max(MIN_WORKER_TIMEOUT_MS);
                let request = AgentRunRequest {
                    task_id: task.id.to_string(),
                    prompt,
                    working_dir: self.runtime_dir.clone(),
                    resume_token: task.resume_token.clone(),
                    timeout: std::time::Duration::from_millis(worker_timeout_ms),
                    env: Vec::new(),
                };
                let outcome = runtime.run(request).await;
                self.finish_inline_task(&task.id, outcome).await
            }
        }
    }

    async fn finish_inline_task(
        &self,
        id: &TaskId,
        outcome: Result<AgentRunOutcome, tf_adapters::AgentRuntimeError>,
    ) -> Result<(), ManagerError> {
        let now = self.clock.epoch_ms();
        match outcome {
            Ok(AgentRunOutcome::Completed {
                result,
                logs,
                resume_token,
            }) => {
                self.patch_task(id, move |task| {
                    task.status = TaskStatus::Completed;
                    task.ended_at_ms = Some(now);
                    task.result = result.clone();
                    task.resume_token = resume_token.clone();
                    for line in &logs {
                        task.push_log(line.clone());
                    }
                    Ok(())
                })
                .await?;
            }
            Ok(AgentRunOutcome::Failed { error, logs }) => {
                self.patch_task(id, move |task| {
                    task.status = TaskStatus::Error;
                    task.ended_at_ms = Some(now);
                    task.error = Some(error.clone());
                    for line in &logs {
                        task.push_log(line.clone());
                    }
                    Ok(())
                })
                .await?;
            }
            Err(e) => {
                self.patch_task(id, move |task| {
                    task.status = TaskStatus::Error;
                    task.ended_at_ms = Some(now);
                    task.error = Some(e.to_string());
                    Ok(())
                })
                .await?;
            }
        }
        Ok(())
    }

    /// Run one scheduling pass: reap stale tasks, then start pending ones.
    /// Never panics or propagates — errors are logged and swallowed so the
    /// caller's poll loop keeps running.
    pub async fn tick(&self) {
        if let Err(e) = self.reap_stale_tasks().await {
            error!(error = %e, "reaper pass failed");
        }
        if let Err(e) = self.start_pending_tasks().await {
            error!(error = %e, "starter pass failed");
        }
    }
}

fn pid_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
