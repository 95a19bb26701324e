use conduit_types::{AgentEvent, RawEvent};
use serde_json::json;

#[test]
fn test_raw_event_tolerates_missing_optional_fields() {
    let raw: RawEvent = serde_json::from_str(r#"{"event":"end"}"#).unwrap();
    assert_eq!(raw.event, "end");
    assert!(raw.content.is_none());
    assert!(raw.metadata.is_none());
}

#[test]
fn test_tool_end_keeps_schema() {
    let raw: RawEvent = serde_json::from_value(json!({
        "event": "tool_end",
        "name": "audit_site",
        "output": {"score": 71},
        "ui_schema": {"component": "score_card"}
    }))
    .unwrap();

    match AgentEvent::try_from(raw).unwrap() {
        AgentEvent::ToolEnd { name, output, ui_schema } => {
            assert_eq!(name, "audit_site");
            assert_eq!(output, json!({"score": 71}));
            assert_eq!(ui_schema, Some(json!({"component": "score_card"})));
        }
        _ => panic!("Expected ToolEnd variant"),
    }
}

#[test]
fn test_agent_switch_prefers_metadata_node() {
    let raw: RawEvent = serde_json::from_value(json!({
        "event": "agent_switch",
        "name": "ignored",
        "metadata": {"langgraph_node": "orchestrator"}
    }))
    .unwrap();

    assert_eq!(AgentEvent::try_from(raw).unwrap(), AgentEvent::agent_switch("orchestrator"));
}

#[test]
fn test_structured_response_accepts_content() {
    let raw: RawEvent = serde_json::from_value(json!({
        "event": "structured_response",
        "content": {"navigate_to": "/calendar"}
    }))
    .unwrap();

    match AgentEvent::try_from(raw).unwrap() {
        AgentEvent::StructuredResponse { payload } => {
            assert_eq!(payload["navigate_to"], "/calendar");
        }
        _ => panic!("Expected StructuredResponse variant"),
    }
}

#[test]
fn test_error_without_content_gets_default_message() {
    let raw: RawEvent = serde_json::from_value(json!({"event": "error"})).unwrap();
    match AgentEvent::try_from(raw).unwrap() {
        AgentEvent::Error { message } => assert!(!message.is_empty()),
        _ => panic!("Expected Error variant"),
    }
}

#[test]
fn test_event_kind_names_match_wire() {
    assert_eq!(AgentEvent::token("x", None).kind(), "token");
    assert_eq!(AgentEvent::delegate("a").kind(), "delegate");
    assert_eq!(AgentEvent::End.kind(), "end");
}
