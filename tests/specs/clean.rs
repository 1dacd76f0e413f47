use crate::prelude::*;
use tf_core::TaskStatus;

#[test]
fn removes_terminal_tasks_but_keeps_active_ones() {
    let runtime = Runtime::empty();
    let done = runtime.seed(fixture_task("done", TaskStatus::Completed));
    let pending = runtime.seed(fixture_task("still going", TaskStatus::Pending));

    runtime
        .tf()
        .args(&["clean"])
        .passes()
        .stdout_has("removed 1 task");

    assert!(runtime.read(done.id.as_str()).is_none());
    assert!(runtime.read(pending.id.as_str()).is_some());
}

#[test]
fn reports_zero_when_nothing_is_terminal() {
    let runtime = Runtime::empty();
    runtime.seed(fixture_task("still going", TaskStatus::Pending));

    runtime
        .tf()
        .args(&["clean"])
        .passes()
        .stdout_has("removed 0 task");
}
