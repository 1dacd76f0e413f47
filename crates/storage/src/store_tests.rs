use super::*;
use tf_core::BackgroundMode;

fn store(dir: &Path) -> CheckpointStore {
    CheckpointStore::new(dir)
}

fn sample_task(id: &str) -> Task {
    Task::new(
        TaskId::new(id),
        "do the thing",
        Default::default(),
        BackgroundMode::WorkerProcess,
        1_000,
    )
}

#[test]
fn write_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let task = sample_task("bg_1");
    store.write_task(&task).unwrap();

    let loaded = store.read_task(&task.id).unwrap().unwrap();
    assert_eq!(loaded.id, task.id);
    assert_eq!(loaded.status, task.status);
}

#[test]
fn read_missing_task_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    assert!(store.read_task(&TaskId::new("bg_missing")).unwrap().is_none());
}

#[test]
fn write_overwrites_prior_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let mut task = sample_task("bg_1");
    store.write_task(&task).unwrap();

    task.version = 2;
    task.push_log("progress");
    store.write_task(&task).unwrap();

    let loaded = store.read_task(&task.id).unwrap().unwrap();
    assert_eq!(loaded.version, 2);
    assert_eq!(loaded.logs, vec!["progress".to_string()]);
}

#[test]
fn list_task_ids_reflects_writes_and_removals() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.write_task(&sample_task("bg_1")).unwrap();
    store.write_task(&sample_task("bg_2")).unwrap();

    let mut ids: Vec<String> = store
        .list_task_ids()
        .unwrap()
        .into_iter()
        .map(|id| id.as_str().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["bg_1".to_string(), "bg_2".to_string()]);

    store.remove_task(&TaskId::new("bg_1")).unwrap();
    let ids = store.list_task_ids().unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0], "bg_2");
}

#[test]
fn list_tasks_loads_every_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.write_task(&sample_task("bg_1")).unwrap();
    store.write_task(&sample_task("bg_2")).unwrap();

    let tasks = store.list_tasks().unwrap();
    assert_eq!(tasks.len(), 2);
}

#[test]
fn remove_missing_task_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    assert!(store.remove_task(&TaskId::new("bg_missing")).is_ok());
}

#[test]
fn append_log_persists_the_new_line() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.write_task(&sample_task("bg_1")).unwrap();

    let updated = store.append_log(&TaskId::new("bg_1"), "hello").unwrap();
    assert_eq!(updated.logs, vec!["hello".to_string()]);

    let reloaded = store.read_task(&TaskId::new("bg_1")).unwrap().unwrap();
    assert_eq!(reloaded.logs, vec!["hello".to_string()]);
}

#[test]
fn append_log_on_missing_task_errors() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let result = store.append_log(&TaskId::new("bg_missing"), "hello");
    assert!(matches!(result, Err(CheckpointError::NotFound(_))));
}
