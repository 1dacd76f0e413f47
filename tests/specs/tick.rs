use crate::prelude::*;
use tf_core::TaskStatus;

#[test]
fn tick_succeeds_on_an_empty_store() {
    let runtime = Runtime::empty();

    runtime.tf().args(&["tick"]).passes().stdout_has("tick complete");
}

#[test]
fn tick_starts_a_pending_inline_task() {
    let runtime = Runtime::empty();
    let mut task = fixture_task("say hello", TaskStatus::Pending);
    task.background_mode = tf_core::BackgroundMode::Inline;
    task.payload.insert(
        "prompt".to_string(),
        serde_json::Value::String("echo hi".to_string()),
    );
    let task = runtime.seed(task);

    runtime
        .tf()
        .args(&["tick"])
        .env("BGTASK_AGENT_COMMAND", "true")
        .passes();

    let fetched = runtime.read(task.id.as_str()).unwrap();
    assert_ne!(fetched.status, TaskStatus::Pending);
}
