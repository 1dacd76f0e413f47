use super::*;

#[test]
fn new_task_id_has_expected_shape() {
    let id = new_task_id();
    assert!(id.as_str().starts_with("bg_"));
    assert_eq!(id.as_str().len(), "bg_".len() + 12);
}

#[test]
fn new_task_id_is_unique() {
    let a = new_task_id();
    let b = new_task_id();
    assert_ne!(a, b);
}

#[test]
fn task_id_equality_with_str() {
    let id = TaskId::new("bg_abc123");
    assert_eq!(id, "bg_abc123");
    assert_eq!(id.as_str(), "bg_abc123");
}

#[test]
fn new_resume_token_is_unique_per_call() {
    let a = new_resume_token();
    let b = new_resume_token();
    assert_ne!(a, b);
    assert!(!a.is_empty());
}
