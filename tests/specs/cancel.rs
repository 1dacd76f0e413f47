use crate::prelude::*;
use tf_core::TaskStatus;

#[test]
fn cancels_a_pending_task() {
    let runtime = Runtime::empty();
    let task = runtime.seed(fixture_task("long haul", TaskStatus::Pending));

    runtime
        .tf()
        .args(&["cancel", task.id.as_str()])
        .passes()
        .stdout_has("cancelled");

    let fetched = runtime.read(task.id.as_str()).unwrap();
    assert_eq!(fetched.status, TaskStatus::Cancelled);
    assert!(fetched.cancelled);
}

#[test]
fn cancelling_an_already_terminal_task_fails() {
    let runtime = Runtime::empty();
    let task = runtime.seed(fixture_task("already done", TaskStatus::Completed));

    runtime
        .tf()
        .args(&["cancel", task.id.as_str()])
        .fails()
        .stderr_has("cancelling task");
}
