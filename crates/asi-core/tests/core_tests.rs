//! Tests for asi-core: TaskKind parsing, Task construction and JSON admission

use asi_core::*;
use serde_json::json;

// ===========================================================================
// TaskKind
// ===========================================================================

#[test]
fn task_kind_known_names() {
    assert_eq!(TaskKind::from("visual"), TaskKind::Visual);
    assert_eq!(TaskKind::from("audio"), TaskKind::Audio);
    assert_eq!(TaskKind::from("action"), TaskKind::Action);
    assert_eq!(TaskKind::from("telemetry".to_string()), TaskKind::Other("telemetry".into()));
}

#[test]
fn task_kind_display_matches_wire_name() {
    assert_eq!(TaskKind::Visual.to_string(), "visual");
    assert_eq!(TaskKind::Other("custom".into()).to_string(), "custom");
    assert_eq!(String::from(TaskKind::Audio), "audio");
}

// ===========================================================================
// Task
// ===========================================================================

#[test]
fn visual_builder_sets_node_and_faces() {
    let task = Task::visual("n1", 3);
    assert_eq!(task.kind, TaskKind::Visual);
    assert_eq!(task.node_id.as_deref(), Some("n1"));
    assert_eq!(task.data_field("faces"), Some(&json!(3)));
    assert!(task.exec.is_none());
}

#[test]
fn priority_defaults_to_zero() {
    let task = Task::new("action");
    assert_eq!(task.priority, None);
    assert_eq!(task.effective_priority(), 0);
    assert_eq!(task.with_priority(7).effective_priority(), 7);
}

#[test]
fn empty_kind_is_empty_task() {
    assert!(Task::new("").is_empty());
    assert!(!Task::new("action").is_empty());
}

#[test]
fn data_field_treats_null_as_absent() {
    let task = Task::new("audio").with_data(json!({"level": null}));
    assert!(task.data_field("level").is_none());
    assert!(Task::new("audio").data_field("level").is_none());
}

#[test]
fn from_value_parses_wire_shape() {
    let task = Task::from_value(&json!({
        "type": "audio",
        "nodeId": "mic",
        "data": {"level": 0.5},
        "priority": 2
    }))
    .unwrap();
    assert_eq!(task.kind, TaskKind::Audio);
    assert_eq!(task.node_id.as_deref(), Some("mic"));
    assert_eq!(task.data_field("level"), Some(&json!(0.5)));
    assert_eq!(task.priority, Some(2));
}

#[test]
fn from_value_rejects_absent_tasks() {
    assert!(Task::from_value(&json!(null)).is_none());
    assert!(Task::from_value(&json!("visual")).is_none());
    assert!(Task::from_value(&json!({"nodeId": "n1"})).is_none());
}

#[test]
fn payload_omits_exec_and_uses_wire_names() {
    let task = Task::action(|| async { Ok(()) }).with_node("door");
    let payload = task.to_payload();
    assert_eq!(payload["type"], "action");
    assert_eq!(payload["nodeId"], "door");
    assert!(payload.get("exec").is_none());
    assert!(format!("{:?}", task).contains("exec: true"));
}

#[tokio::test]
async fn action_exec_is_invocable_and_shared_across_clones() {
    let task = Task::action(|| async { anyhow::bail!("nope") });
    let clone = task.clone();
    let exec = clone.exec.unwrap();
    let err = exec().await.unwrap_err();
    assert_eq!(err.to_string(), "nope");
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_messages_carry_context() {
    let e = Error::part_failed("vision", "camera offline");
    assert_eq!(e.to_string(), "part failed: vision - camera offline");
    let e = Error::timeout("poll of vision", 250);
    assert_eq!(e.to_string(), "poll of vision timed out after 250ms");
    let e = Error::MissingNode { kind: "visual".into() };
    assert_eq!(e.to_string(), "visual task has no node id");
}
