use crate::prelude::*;
use tf_core::TaskStatus;

#[test]
fn lists_every_seeded_task() {
    let runtime = Runtime::empty();
    runtime.seed(fixture_task("build the widget", TaskStatus::Pending));
    runtime.seed(fixture_task("ship the widget", TaskStatus::Completed));

    runtime
        .tf()
        .args(&["list"])
        .passes()
        .stdout_has("build the widget")
        .stdout_has("ship the widget");
}

#[test]
fn filters_by_status() {
    let runtime = Runtime::empty();
    runtime.seed(fixture_task("pending task", TaskStatus::Pending));
    runtime.seed(fixture_task("done task", TaskStatus::Completed));

    runtime
        .tf()
        .args(&["list", "--status", "completed"])
        .passes()
        .stdout_has("done task")
        .stdout_lacks("pending task");
}

#[test]
fn reports_when_no_tasks_exist() {
    let runtime = Runtime::empty();

    runtime.tf().args(&["list"]).passes().stdout_has("no tasks");
}
