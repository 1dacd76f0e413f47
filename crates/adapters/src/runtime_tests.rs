use super::*;

#[test]
fn timed_out_error_message_includes_duration() {
    let err = AgentRuntimeError::TimedOut(Duration::from_secs(30));
    assert_eq!(err.to_string(), "timed out after 30s");
}

#[test]
fn request_carries_resume_token_through() {
    let request = AgentRunRequest {
        task_id: "bg_1".to_string(),
        prompt: "do it".to_string(),
        working_dir: PathBuf::from("/tmp"),
        resume_token: Some("tok".to_string()),
        timeout: Duration::from_secs(1),
        env: vec![("BGTASK_ID".to_string(), "bg_1".to_string())],
    };
    assert_eq!(request.resume_token.as_deref(), Some("tok"));
    assert_eq!(request.env.len(), 1);
}
