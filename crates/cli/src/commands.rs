// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tf` subcommands — a thin layer over the [`BackgroundManager`].

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use tf_core::{SystemClock, Task, TaskId};
use tf_engine::BackgroundManager;

use crate::color;
use crate::table::{Column, Table};

pub async fn list(manager: &BackgroundManager<SystemClock>, status_filter: Option<&str>) -> Result<()> {
    let mut tasks = manager.list().context("listing tasks")?;
    tasks.sort_by_key(|t| t.created_at_ms);

    if let Some(filter) = status_filter {
        tasks.retain(|t| t.status.to_string() == filter);
    }

    let mut table = Table::new(vec![
        Column::left("ID"),
        Column::status("STATUS"),
        Column::left("MODE"),
        Column::right("ATTEMPT"),
        Column::muted("CREATED"),
        Column::left("DESCRIPTION").with_max(60),
    ]);
    for task in &tasks {
        table.row(vec![
            task.id.to_string(),
            task.status.to_string(),
            task.background_mode.to_string(),
            task.attempt.to_string(),
            format_timestamp(task.created_at_ms),
            task.description.clone(),
        ]);
    }

    let mut out = std::io::stdout();
    if tasks.is_empty() {
        println!("{}", color::muted("no tasks"));
    } else {
        table.render(&mut out);
    }
    Ok(())
}

pub async fn show(manager: &BackgroundManager<SystemClock>, id: &str) -> Result<()> {
    let task = get_task(manager, id)?;

    println!("{:<16} {}", color::muted("id:"), task.id);
    println!("{:<16} {}", color::muted("status:"), color::status(&task.status.to_string()));
    println!("{:<16} {}", color::muted("mode:"), task.background_mode);
    println!("{:<16} {}", color::muted("attempt:"), task.attempt);
    println!("{:<16} {}", color::muted("description:"), task.description);
    println!("{:<16} {}", color::muted("created:"), format_timestamp(task.created_at_ms));
    if let Some(started) = task.started_at_ms {
        println!("{:<16} {}", color::muted("started:"), format_timestamp(started));
    }
    if let Some(ended) = task.ended_at_ms {
        println!("{:<16} {}", color::muted("ended:"), format_timestamp(ended));
    }
    if let Some(pid) = task.worker_pid {
        println!("{:<16} {}", color::muted("worker pid:"), pid);
    }
    if let Some(error) = &task.error {
        println!("{:<16} {}", color::muted("error:"), error);
    }
    if let Some(result) = &task.result {
        println!("{:<16}", color::muted("result:"));
        println!("{}", serde_json::to_string_pretty(result)?);
    }
    if !task.logs.is_empty() {
        println!("{:<16}", color::muted("recent logs:"));
        for line in task.logs.iter().rev().take(20).rev() {
            println!("  {line}");
        }
    }
    Ok(())
}

pub async fn cancel(manager: &BackgroundManager<SystemClock>, id: &str) -> Result<()> {
    let task_id = resolve_id(manager, id)?;
    let task = manager.cancel(&task_id).await.context("cancelling task")?;
    println!("cancelled {}", task.id);
    Ok(())
}

pub async fn retry(manager: &BackgroundManager<SystemClock>, id: &str) -> Result<()> {
    let task_id = resolve_id(manager, id)?;
    let task = manager.retry(&task_id).await.context("retrying task")?;
    println!("retrying {} (attempt {})", task.id, task.attempt);
    Ok(())
}

pub async fn clean(manager: &BackgroundManager<SystemClock>, before_ms: Option<u64>) -> Result<()> {
    let removed = manager.clean(before_ms).context("cleaning terminal tasks")?;
    println!("removed {} task(s)", removed.len());
    for id in removed {
        println!("  {id}");
    }
    Ok(())
}

pub async fn tick(manager: &BackgroundManager<SystemClock>) -> Result<()> {
    manager.tick().await;
    println!("tick complete");
    Ok(())
}

fn get_task(manager: &BackgroundManager<SystemClock>, id: &str) -> Result<Task> {
    manager
        .get(&resolve_id(manager, id)?)?
        .ok_or_else(|| anyhow::anyhow!("task {id} not found"))
}

/// Resolve a possibly-abbreviated id (bare suffix, no `bg_` prefix) against
/// the store. Exact matches win; otherwise the id is used as-is so the
/// manager's own "not found" error surfaces.
fn resolve_id(manager: &BackgroundManager<SystemClock>, id: &str) -> Result<TaskId> {
    if id.starts_with("bg_") {
        return Ok(TaskId::new(id));
    }
    let candidate = format!("bg_{id}");
    if manager.get(&TaskId::new(candidate.clone()))?.is_some() {
        return Ok(TaskId::new(candidate));
    }
    Ok(TaskId::new(id))
}

fn format_timestamp(epoch_ms: u64) -> String {
    Utc.timestamp_millis_opt(epoch_ms as i64)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
