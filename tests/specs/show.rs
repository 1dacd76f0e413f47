use crate::prelude::*;
use tf_core::TaskStatus;

#[test]
fn shows_full_detail_for_a_known_task() {
    let runtime = Runtime::empty();
    let task = runtime.seed(fixture_task("investigate the outage", TaskStatus::Running));

    runtime
        .tf()
        .args(&["show", task.id.as_str()])
        .passes()
        .stdout_has("investigate the outage")
        .stdout_has("running");
}

#[test]
fn accepts_a_bare_suffix_without_the_bg_prefix() {
    let runtime = Runtime::empty();
    let task = runtime.seed(fixture_task("investigate the outage", TaskStatus::Running));
    let suffix = task.id.as_str().trim_start_matches("bg_");

    runtime
        .tf()
        .args(&["show", suffix])
        .passes()
        .stdout_has("investigate the outage");
}

#[test]
fn fails_for_an_unknown_task_id() {
    let runtime = Runtime::empty();

    runtime.tf().args(&["show", "bg_does_not_exist"]).fails();
}
