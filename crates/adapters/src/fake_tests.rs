use super::*;
use std::path::PathBuf;
use std::time::Duration;

fn request(task_id: &str) -> AgentRunRequest {
    AgentRunRequest {
        task_id: task_id.to_string(),
        prompt: "do it".to_string(),
        working_dir: PathBuf::from("."),
        resume_token: None,
        timeout: Duration::from_secs(1),
        env: Vec::new(),
    }
}

#[tokio::test]
async fn default_outcome_is_success() {
    let runtime = FakeAgentRuntime::new();
    let outcome = runtime.run(request("bg_1")).await.unwrap();
    assert!(matches!(outcome, AgentRunOutcome::Completed { .. }));
    assert_eq!(runtime.call_count(), 1);
}

#[tokio::test]
async fn scripted_outcomes_are_consumed_in_order() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_outcome(AgentRunOutcome::Failed {
        error: "boom".to_string(),
        logs: Vec::new(),
    });
    runtime.push_outcome(AgentRunOutcome::Completed {
        result: None,
        logs: Vec::new(),
        resume_token: None,
    });

    let first = runtime.run(request("bg_1")).await.unwrap();
    assert!(matches!(first, AgentRunOutcome::Failed { .. }));

    let second = runtime.run(request("bg_1")).await.unwrap();
    assert!(matches!(second, AgentRunOutcome::Completed { .. }));
}

#[tokio::test]
async fn scripted_error_surfaces_as_runtime_error() {
    let runtime = FakeAgentRuntime::new();
    runtime.push_error("spawn exploded");
    let result = runtime.run(request("bg_1")).await;
    assert!(matches!(result, Err(AgentRuntimeError::SpawnFailed(_))));
}

#[tokio::test]
async fn records_calls_with_task_id_and_prompt() {
    let runtime = FakeAgentRuntime::new();
    runtime.run(request("bg_42")).await.unwrap();
    let calls = runtime.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].task_id, "bg_42");
    assert_eq!(calls[0].prompt, "do it");
}
