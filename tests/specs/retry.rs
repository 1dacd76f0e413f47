use crate::prelude::*;
use tf_core::TaskStatus;

#[test]
fn retries_an_errored_task() {
    let runtime = Runtime::empty();
    let mut task = fixture_task("flaky step", TaskStatus::Error);
    task.error = Some("boom".to_string());
    let task = runtime.seed(task);

    runtime
        .tf()
        .args(&["retry", task.id.as_str()])
        .passes()
        .stdout_has("retrying");

    let fetched = runtime.read(task.id.as_str()).unwrap();
    assert_eq!(fetched.status, TaskStatus::Pending);
    assert_eq!(fetched.attempt, 2);
    assert!(fetched.error.is_none());
}

#[test]
fn retrying_a_non_revivable_task_fails() {
    let runtime = Runtime::empty();
    let task = runtime.seed(fixture_task("still pending", TaskStatus::Pending));

    runtime.tf().args(&["retry", task.id.as_str()]).fails();
}
