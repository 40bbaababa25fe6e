// crates/nodalcore/tests/state_test.rs

use nodalcore::{FieldRef, MethodError, Node, Parameters, StateTable, Value, Workflow};

fn messages_result() -> Value {
    Value::object([(
        "messages",
        Value::Array(vec![
            Value::object([("id", "1"), ("type", "text")]),
            Value::object([("id", "2"), ("type", "voice")]),
        ]),
    )])
}

#[test]
fn test_positional_write_leaves_gap() {
    let mut state = StateTable::new();
    state.begin_workflow(0);
    state.write(0, 0, Value::from("first"));
    state.write(0, 2, Value::from("third"));

    let slots = state.workflow(0).unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0], Some(Value::from("first")));
    assert_eq!(slots[1], None);
    assert_eq!(slots[2], Some(Value::from("third")));
    assert!(state.result(0, 1).is_none());
}

#[test]
fn test_begin_workflow_starts_empty() {
    let mut state = StateTable::new();
    state.begin_workflow(3);

    assert_eq!(state.len(), 1);
    assert_eq!(state.workflow(3).map(|s| s.len()), Some(0));
    assert!(state.workflow(0).is_none());
}

#[test]
fn test_clear_empties_table() {
    let mut state = StateTable::new();
    state.write(0, 0, Value::Bool(true));
    state.write(1, 0, Value::Bool(false));
    assert_eq!(state.len(), 2);

    state.clear();
    assert!(state.is_empty());
}

#[test]
fn test_resolve_field_ref() {
    let mut state = StateTable::new();
    state.write(0, 0, messages_result());

    let messages = state.resolve(&FieldRef::new(0, 0).key("messages")).unwrap();
    assert_eq!(messages.as_array().map(|m| m.len()), Some(2));

    let kind = state
        .resolve(&FieldRef::new(0, 0).key("messages").index(1).key("type"))
        .unwrap();
    assert_eq!(kind.as_str(), Some("voice"));

    assert!(state.resolve(&FieldRef::new(0, 0).key("missing")).is_none());
    assert!(state.resolve(&FieldRef::new(0, 1)).is_none());
    assert!(state
        .resolve(&FieldRef::new(0, 0).key("messages").index(9))
        .is_none());
}

#[test]
fn test_field_ref_from_json() {
    let field: FieldRef =
        serde_json::from_str(r#"{"node": 0, "path": ["messages", 0, "type"]}"#).unwrap();

    assert_eq!(field, FieldRef::new(0, 0).key("messages").index(0).key("type"));
    assert_eq!(field.to_string(), "state[0][0].messages[0].type");
}

#[test]
fn test_state_serializes_with_gaps_as_null() {
    let mut state = StateTable::new();
    state.write(0, 1, Value::from(1.0));

    let json = serde_json::to_value(&state).unwrap();
    assert_eq!(json, serde_json::json!({ "0": [null, 1.0] }));
}

#[test]
fn test_workflow_from_json() {
    let json = r#"{
        "name": "greet",
        "nodes": [
            { "name": "Say hi", "entity": "Debug", "method": "log", "parameters": { "message": "hi" } },
            { "name": "Wait", "entity": "Time", "method": "delay" }
        ]
    }"#;
    let workflow: Workflow = serde_json::from_str(json).unwrap();

    assert_eq!(workflow.label(), "greet");
    assert_eq!(workflow.len(), 2);
    assert_eq!(
        workflow.nodes[0].parameters.get("message"),
        Some(&Value::from("hi"))
    );
    assert!(workflow.nodes[1].parameters.is_empty());
}

#[test]
fn test_parameters_helpers() {
    let params = Parameters::new().with("chatId", "12345").with("count", 3i64);

    assert_eq!(params.require_str("chatId").unwrap(), "12345");
    assert_eq!(
        params.require("text"),
        Err(MethodError::MissingParameter("text".to_string()))
    );
    assert!(matches!(
        params.require_str("count"),
        Err(MethodError::InvalidParameterType { .. })
    ));
    assert_eq!(params.get_or("limit", Value::from(10i64)), Value::from(10i64));
}

#[test]
fn test_parameters_parse_typed() {
    #[derive(serde::Deserialize)]
    struct Delay {
        delay_ms: u64,
        nodes: Vec<Node>,
    }

    let params = Parameters::new()
        .with("delay_ms", 250i64)
        .with(
            "nodes",
            Value::Array(vec![Value::object([
                ("name", "inner"),
                ("entity", "Debug"),
                ("method", "log"),
            ])]),
        );

    let parsed: Delay = params.parse().unwrap();
    assert_eq!(parsed.delay_ms, 250);
    assert_eq!(parsed.nodes[0].entity, "Debug");

    let bad = Parameters::new().with("delay_ms", "soon");
    assert!(matches!(
        bad.parse::<Delay>(),
        Err(MethodError::InvalidParameters(_))
    ));
}

#[test]
fn test_value_untagged_json() {
    let value: Value = serde_json::from_str(r#"{"a": [1, "x", true, null]}"#).unwrap();
    let items = value.get("a").and_then(|a| a.as_array()).unwrap();

    assert_eq!(items[0], Value::Number(1.0));
    assert_eq!(items[1], Value::from("x"));
    assert_eq!(items[2], Value::Bool(true));
    assert!(items[3].is_null());
}
