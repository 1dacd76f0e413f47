// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Stage Scheduler: runs a declarative [`Stage`] of logical tasks to
//! completion as one barrier, respecting dependency order, file isolation,
//! and a concurrency cap.

use crate::error::StageError;
use crate::manager::BackgroundManager;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tf_core::{
    BackgroundMode, Clock, Config, FileChange, LogicalTask, LogicalTaskStatus, Stage, StageResult,
    SystemClock, TaskId, TaskProgress, TaskStatus, WorkerResult,
};
use tracing::{info, instrument, warn};

/// Literal marker a worker's `reply` carries when it considers its own
/// run fully done.
const COMPLETION_MARKER: &str = "[TASK_COMPLETE]";

/// Case-insensitive substrings in a `completed` task's `reply` that
/// indicate the provider silently failed despite the worker exiting
/// cleanly (e.g. a transient API error swallowed by the agent loop).
const SILENT_ERROR_MARKERS: [&str; 6] = [
    "provider error",
    "api timeout",
    "rate limit",
    "503",
    "connection reset",
    "econnreset",
];

pub struct StageScheduler<C: Clock = SystemClock> {
    manager: std::sync::Arc<BackgroundManager<C>>,
    config: Config,
}

impl<C: Clock> StageScheduler<C> {
    pub fn new(manager: std::sync::Arc<BackgroundManager<C>>, config: Config) -> Self {
        Self { manager, config }
    }

    /// Run every logical task in `stage` to completion, honoring
    /// `depends_on` ordering and the configured concurrency cap.
    #[instrument(skip(self, stage), fields(stage_id = %stage.stage_id))]
    pub async fn run_stage_barrier(&self, stage: &Stage) -> Result<StageResult, StageError> {
        validate_unique_ids(&stage.tasks)?;
        validate_file_isolation(&stage.tasks)?;
        validate_dependencies(&stage.tasks)?;

        let mut progress: HashMap<String, TaskProgress> = stage
            .tasks
            .iter()
            .map(|t| (t.task_id.clone(), TaskProgress::waiting()))
            .collect();
        let by_id: HashMap<&str, &LogicalTask> =
            stage.tasks.iter().map(|t| (t.task_id.as_str(), t)).collect();

        loop {
            self.cascade_skip(&stage.tasks, &mut progress);

            let running = progress
                .values()
                .filter(|p| p.status == LogicalTaskStatus::Running)
                .count();
            let mut available = self.config.stage_max_concurrency.saturating_sub(running as u32);

            for task in &stage.tasks {
                if available == 0 {
                    break;
                }
                if !self.is_ready(task, &progress) {
                    continue;
                }
                self.dispatch(stage, task, &mut progress).await?;
                available -= 1;
            }

            self.poll_running(&by_id, &mut progress).await?;

            if progress.values().all(|p| p.status.is_terminal()) {
                break;
            }

            tokio::time::sleep(Duration::from_millis(self.config.stage_poll_interval_ms)).await;
        }

        Ok(summarize(progress))
    }

    fn is_ready(&self, task: &LogicalTask, progress: &HashMap<String, TaskProgress>) -> bool {
        let Some(p) = progress.get(&task.task_id) else {
            return false;
        };
        if p.status != LogicalTaskStatus::Waiting {
            return false;
        }
        task.depends_on.iter().all(|dep| {
            progress
                .get(dep)
                .map(|p| p.status == LogicalTaskStatus::Completed)
                .unwrap_or(false)
        })
    }

    fn cascade_skip(&self, tasks: &[LogicalTask], progress: &mut HashMap<String, TaskProgress>) {
        let mut changed = true;
        while changed {
            changed = false;
            for task in tasks {
                let currently_waiting = progress
                    .get(&task.task_id)
                    .map(|p| p.status == LogicalTaskStatus::Waiting)
                    .unwrap_or(false);
                if !currently_waiting {
                    continue;
                }
                let blocked = task.depends_on.iter().any(|dep| {
                    progress
                        .get(dep)
                        .map(|p| matches!(p.status, LogicalTaskStatus::Error | LogicalTaskStatus::Skipped))
                        .unwrap_or(false)
                });
                if blocked {
                    if let Some(p) = progress.get_mut(&task.task_id) {
                        p.status = LogicalTaskStatus::Skipped;
                        changed = true;
                    }
                }
            }
        }
    }

    #[instrument(skip(self, stage, task, progress), fields(task_id = %task.task_id))]
    async fn dispatch(
        &self,
        stage: &Stage,
        task: &LogicalTask,
        progress: &mut HashMap<String, TaskProgress>,
    ) -> Result<(), StageError> {
        let (attempt, resume_token, prior_context) = progress
            .get(&task.task_id)
            .map(|p| (p.attempt, p.resume_token.clone(), p.error.clone()))
            .unwrap_or((1, None, None));

        let mut payload = HashMap::new();
        payload.insert(
            "logical_task_id".to_string(),
            serde_json::Value::String(task.task_id.clone()),
        );
        payload.insert(
            "stage_id".to_string(),
            serde_json::Value::String(stage.stage_id.clone()),
        );
        if let Some(session_id) = &task.session_id {
            payload.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        if let Some(model) = &task.model {
            payload.insert("model".to_string(), serde_json::Value::String(model.clone()));
        }
        if let Some(provider_type) = &task.provider_type {
            payload.insert(
                "provider_type".to_string(),
                serde_json::Value::String(provider_type.clone()),
            );
        }
        payload.insert("prompt".to_string(), serde_json::Value::String(task.prompt.clone()));
        payload.insert("planned_files".to_string(), serde_json::json!(task.planned_files));
        payload.insert("acceptance".to_string(), serde_json::json!(task.acceptance));
        if let Some(context) = &prior_context {
            payload.insert("prior_context".to_string(), serde_json::Value::String(context.clone()));
        }
        payload.insert("attempt".to_string(), serde_json::json!(attempt));
        if let Some(token) = &resume_token {
            payload.insert("resume_token".to_string(), serde_json::Value::String(token.clone()));
        }
        payload.insert(
            "worker_timeout_ms".to_string(),
            serde_json::json!(self.config.background_worker_timeout_ms),
        );

        let background =
            self.manager
                .launch_delegate_task(task.prompt.clone(), payload, BackgroundMode::Inline)?;
        info!(task_id = %task.task_id, background_task_id = %background.id, "dispatched logical task");

        let p = progress
            .entry(task.task_id.clone())
            .or_insert_with(TaskProgress::waiting);
        p.status = LogicalTaskStatus::Running;
        p.background_task_id = Some(background.id.to_string());
        p.started_at_ms = background.started_at_ms.or(Some(background.created_at_ms));
        Ok(())
    }

    async fn poll_running(
        &self,
        by_id: &HashMap<&str, &LogicalTask>,
        progress: &mut HashMap<String, TaskProgress>,
    ) -> Result<(), StageError> {
        self.manager.tick().await;

        let running_ids: Vec<String> = progress
            .iter()
            .filter(|(_, p)| p.status == LogicalTaskStatus::Running)
            .map(|(id, _)| id.clone())
            .collect();

        for task_id in running_ids {
            let Some(background_id) = progress.get(&task_id).and_then(|p| p.background_task_id.clone())
            else {
                continue;
            };
            let background = self
                .manager
                .get(&TaskId::new(background_id))?
                .ok_or_else(|| StageError::Manager(crate::error::ManagerError::NotFound(task_id.clone())))?;

            if !background.is_terminal() {
                continue;
            }

            let logical = by_id.get(task_id.as_str()).copied();

            if background.status == TaskStatus::Cancelled {
                let p = progress.entry(task_id.clone()).or_insert_with(TaskProgress::waiting);
                p.status = LogicalTaskStatus::Error;
                p.error = Some("background task was cancelled".to_string());
                p.ended_at_ms = background.ended_at_ms;
                continue;
            }

            let worker_result = background.result.as_ref().and_then(|v| serde_json::from_value::<WorkerResult>(v.clone()).ok());
            let silently_failed = background.status == TaskStatus::Completed
                && has_silent_error(logical, worker_result.as_ref());

            if background.status == TaskStatus::Completed && !silently_failed {
                let p = progress.entry(task_id.clone()).or_insert_with(TaskProgress::waiting);
                p.status = LogicalTaskStatus::Completed;
                p.result = background.result.clone();
                p.ended_at_ms = background.ended_at_ms;
                continue;
            }

            let max_retries = logical.and_then(|t| t.max_retries).unwrap_or(self.config.stage_task_max_retries);
            let attempt = progress.get(&task_id).map(|p| p.attempt).unwrap_or(1);

            if attempt <= max_retries {
                warn!(task_id = %task_id, attempt, "logical task failed, retrying");
                let revived = self.manager.retry(&TaskId::new(background_id)).await?;
                let p = progress.entry(task_id.clone()).or_insert_with(TaskProgress::waiting);
                p.status = LogicalTaskStatus::Waiting;
                p.attempt += 1;
                p.resume_token = revived.resume_token.clone();
                p.error = if silently_failed {
                    Some("completed but result indicated a silent failure".to_string())
                } else {
                    background.error.clone()
                };
            } else {
                let p = progress.entry(task_id.clone()).or_insert_with(TaskProgress::waiting);
                p.status = LogicalTaskStatus::Error;
                p.error = if silently_failed {
                    Some("completed but result indicated a silent failure".to_string())
                } else {
                    background.error.clone()
                };
                p.ended_at_ms = background.ended_at_ms;
            }
        }
        Ok(())
    }
}

/// Reclassify a `completed` background task as a silent failure per the
/// outcome-classification rules: non-empty `remaining_files`, a
/// provider-failure pattern in `reply`, or declared `planned_files` left
/// untouched (no completed files, no tool events).
fn has_silent_error(task: Option<&LogicalTask>, result: Option<&WorkerResult>) -> bool {
    let declared_planned_files = task.map(|t| !t.planned_files.is_empty()).unwrap_or(false);

    let Some(result) = result else {
        return declared_planned_files;
    };

    if !result.remaining_files.is_empty() {
        return true;
    }
    let lower_reply = result.reply.to_lowercase();
    if SILENT_ERROR_MARKERS.iter().any(|marker| lower_reply.contains(marker)) {
        return true;
    }
    declared_planned_files && result.completed_files.is_empty() && result.tool_events == 0
}

fn validate_unique_ids(tasks: &[LogicalTask]) -> Result<(), StageError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.task_id.as_str()) {
            return Err(StageError::DuplicateTaskId(task.task_id.clone()));
        }
    }
    Ok(())
}

fn validate_dependencies(tasks: &[LogicalTask]) -> Result<(), StageError> {
    let ids: HashSet<&str> = tasks.iter().map(|t| t.task_id.as_str()).collect();
    for task in tasks {
        for dep in &task.depends_on {
            if !ids.contains(dep.as_str()) {
                return Err(StageError::UnknownDependency {
                    task: task.task_id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    detect_cycle(tasks)
}

fn detect_cycle(tasks: &[LogicalTask]) -> Result<(), StageError> {
    let mut indegree: HashMap<&str, usize> = tasks
        .iter()
        .map(|t| (t.task_id.as_str(), t.depends_on.len()))
        .collect();

    let mut queue: Vec<&str> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut visited = 0;
    let dependents: HashMap<&str, Vec<&str>> = {
        let mut map: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in tasks {
            for dep in &task.depends_on {
                map.entry(dep.as_str()).or_default().push(task.task_id.as_str());
            }
        }
        map
    };

    while let Some(id) = queue.pop() {
        visited += 1;
        if let Some(children) = dependents.get(id) {
            for child in children {
                if let Some(d) = indegree.get_mut(child) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push(child);
                    }
                }
            }
        }
    }

    if visited != tasks.len() {
        let stuck: Vec<String> = indegree
            .into_iter()
            .filter(|(_, d)| *d > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        return Err(StageError::CycleDetected(stuck));
    }
    Ok(())
}

fn validate_file_isolation(tasks: &[LogicalTask]) -> Result<(), StageError> {
    let dependents: HashMap<&str, Vec<&str>> = {
        let mut map: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in tasks {
            for dep in &task.depends_on {
                map.entry(dep.as_str()).or_default().push(task.task_id.as_str());
            }
        }
        map
    };

    for i in 0..tasks.len() {
        for j in (i + 1)..tasks.len() {
            if is_ordered(&tasks[i].task_id, &tasks[j].task_id, &dependents) {
                continue;
            }
            for path in &tasks[i].planned_files {
                if tasks[j].planned_files.contains(path) {
                    return Err(StageError::FileIsolationViolation {
                        a: tasks[i].task_id.clone(),
                        b: tasks[j].task_id.clone(),
                        path: path.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Whether `a` and `b` are ordered by the `depends_on` relation — one is a
/// transitive ancestor or descendant of the other. Ordered pairs are
/// exempt from the file-isolation check, since `b` only ever runs after
/// `a`'s planned files have already landed (or vice versa).
fn is_ordered(a: &str, b: &str, dependents: &HashMap<&str, Vec<&str>>) -> bool {
    is_reachable(a, b, dependents) || is_reachable(b, a, dependents)
}

/// BFS over the "depends on me" edges: is `to` reachable from `from`,
/// i.e. does completing `from` transitively unblock `to`?
fn is_reachable(from: &str, to: &str, dependents: &HashMap<&str, Vec<&str>>) -> bool {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![from];
    while let Some(id) = stack.pop() {
        if let Some(children) = dependents.get(id) {
            for child in children {
                if *child == to {
                    return true;
                }
                if seen.insert(child) {
                    stack.push(child);
                }
            }
        }
    }
    false
}

fn summarize(progress: HashMap<String, TaskProgress>) -> StageResult {
    let success_count = progress
        .values()
        .filter(|p| p.status == LogicalTaskStatus::Completed)
        .count() as u32;
    let fail_count = progress
        .values()
        .filter(|p| matches!(p.status, LogicalTaskStatus::Error | LogicalTaskStatus::Skipped))
        .count() as u32;
    let retry_count = progress.values().map(|p| p.attempt.saturating_sub(1)).sum();
    let all_success = fail_count == 0;

    let mut file_changes: Vec<FileChange> = Vec::new();
    let mut tool_events = 0u32;
    let mut completion_marker_seen = false;
    for p in progress.values() {
        if p.status != LogicalTaskStatus::Completed {
            continue;
        }
        let Some(result) = p
            .result
            .as_ref()
            .and_then(|v| serde_json::from_value::<WorkerResult>(v.clone()).ok())
        else {
            continue;
        };
        file_changes.extend(result.file_changes);
        tool_events += result.tool_events;
        if result.reply.contains(COMPLETION_MARKER) {
            completion_marker_seen = true;
        }
    }

    StageResult {
        all_success,
        success_count,
        fail_count,
        retry_count,
        completion_marker_seen,
        task_progress: progress,
        file_changes,
        tool_events,
    }
}

#[cfg(test)]
#[path = "stage_scheduler_tests.rs"]
mod tests;
