use super::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tf_adapters::FakeAgentRuntime;
use tf_core::{BackgroundMode, Config, TaskStatus};
use tf_storage::CheckpointStore;

fn manager(dir: &std::path::Path) -> BackgroundManager<SystemClock> {
    let store = Arc::new(CheckpointStore::new(dir));
    BackgroundManager::new(
        store,
        SystemClock,
        Config::default(),
        dir.to_path_buf(),
        PathBuf::from("/bin/true"),
        Arc::new(FakeAgentRuntime::new()),
    )
}

#[tokio::test]
async fn list_prints_table_with_launched_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    mgr.launch("do something", HashMap::new(), BackgroundMode::Inline).unwrap();

    assert!(list(&mgr, None).await.is_ok());
}

#[tokio::test]
async fn list_with_unknown_filter_prints_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    mgr.launch("do something", HashMap::new(), BackgroundMode::Inline).unwrap();

    assert!(list(&mgr, Some("error")).await.is_ok());
}

#[tokio::test]
async fn show_unknown_task_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());

    let result = show(&mgr, "bg_nope").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn show_known_task_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let task = mgr.launch("do something", HashMap::new(), BackgroundMode::Inline).unwrap();

    assert!(show(&mgr, task.id.as_str()).await.is_ok());
}

#[tokio::test]
async fn cancel_transitions_task_to_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let task = mgr.launch("do something", HashMap::new(), BackgroundMode::Inline).unwrap();

    cancel(&mgr, task.id.as_str()).await.unwrap();
    let fetched = mgr.get(&task.id).unwrap().unwrap();
    assert_eq!(fetched.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn retry_on_non_revivable_task_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let task = mgr.launch("do something", HashMap::new(), BackgroundMode::Inline).unwrap();

    let result = retry(&mgr, task.id.as_str()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn clean_removes_terminal_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let task = mgr.launch("do something", HashMap::new(), BackgroundMode::Inline).unwrap();
    mgr.cancel(&task.id).await.unwrap();

    clean(&mgr, None).await.unwrap();
    assert!(mgr.get(&task.id).unwrap().is_none());
}

#[tokio::test]
async fn tick_runs_without_error_on_an_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());

    assert!(tick(&mgr).await.is_ok());
}

#[test]
fn resolve_id_passes_through_full_ids_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let resolved = resolve_id(&mgr, "bg_abc123").unwrap();
    assert_eq!(resolved.as_str(), "bg_abc123");
}

#[test]
fn resolve_id_expands_a_bare_suffix_that_matches_a_stored_task() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = manager(dir.path());
    let task = mgr.launch("do something", HashMap::new(), BackgroundMode::Inline).unwrap();
    let suffix = task.id.as_str().trim_start_matches("bg_");

    let resolved = resolve_id(&mgr, suffix).unwrap();
    assert_eq!(resolved, task.id);
}
