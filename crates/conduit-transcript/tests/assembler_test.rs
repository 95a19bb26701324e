use conduit_transcript::TranscriptAssembler;
use conduit_types::{AgentEvent, DelegationStatus, Message, ToolStatus, TOOLS_PSEUDO_AGENT};
use serde_json::json;

fn orchestration_trace() -> Vec<AgentEvent> {
    vec![
        AgentEvent::ThreadId { thread_id: "thread-42".to_string() },
        AgentEvent::token("Let me hand this to our SEO specialist. ", Some("orchestrator")),
        AgentEvent::delegate("seo_agent"),
        AgentEvent::tool_start("audit_site", json!({"url": "https://acme.test", "depth": 2})),
        AgentEvent::token("Auditing now.", Some("seo_agent")),
        AgentEvent::ToolEnd {
            name: "audit_site".to_string(),
            output: json!({"score": 82, "issues": [{"id": 1}, {"id": 2}]}),
            ui_schema: Some(json!({"component": "audit_card"})),
        },
        AgentEvent::agent_switch("orchestrator"),
        AgentEvent::token(" Done!", Some("orchestrator")),
        AgentEvent::StructuredResponse { payload: json!({"suggested_actions": ["schedule"]}) },
        AgentEvent::End,
    ]
}

#[test]
fn test_idempotent_replay() {
    let first = TranscriptAssembler::replay(Message::assistant_placeholder(), orchestration_trace());
    let second = TranscriptAssembler::replay(Message::assistant_placeholder(), orchestration_trace());

    let (a, b) = (first.message(), second.message());
    assert_eq!(a.content, b.content);
    assert_eq!(a.segments, b.segments);
    assert_eq!(a.tool_invocations, b.tool_invocations);
    assert_eq!(a.delegations, b.delegations);
    assert_eq!(a.active_agent, b.active_agent);
    assert_eq!(first.structured_response(), second.structured_response());
}

#[test]
fn test_full_trace_shape() {
    let assembler = TranscriptAssembler::replay(Message::assistant_placeholder(), orchestration_trace());
    let message = assembler.message();

    assert!(!message.streaming);
    assert_eq!(
        message.content,
        "Let me hand this to our SEO specialist. Auditing now. Done!"
    );

    let agents: Vec<&str> = message.segments.iter().map(|s| s.agent.as_str()).collect();
    assert_eq!(agents, vec!["orchestrator", "seo_agent", "orchestrator"]);

    let tools: Vec<_> = message.segment_tools(&message.segments[1]).collect();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].status, ToolStatus::Complete);
    assert_eq!(tools[0].ui_schema, Some(json!({"component": "audit_card"})));

    assert_eq!(message.delegations[0].status, DelegationStatus::Complete);
    assert_eq!(assembler.server_thread_id(), Some("thread-42"));
}

#[test]
fn test_segment_merge_rule() {
    let assembler = TranscriptAssembler::replay(
        Message::assistant_placeholder(),
        vec![
            AgentEvent::token("a", Some("agentA")),
            AgentEvent::token("b", Some("agentA")),
            AgentEvent::token("c", Some("agentB")),
            AgentEvent::token("d", Some("agentA")),
        ],
    );

    let segments: Vec<(&str, &str)> = assembler
        .message()
        .segments
        .iter()
        .map(|s| (s.agent.as_str(), s.text.as_str()))
        .collect();
    assert_eq!(segments, vec![("agentA", "ab"), ("agentB", "c"), ("agentA", "d")]);
    assert_eq!(assembler.message().content, "abcd");
}

#[test]
fn test_tool_without_any_attribution_goes_to_tools_pseudo_agent() {
    let assembler = TranscriptAssembler::replay(
        Message::assistant_placeholder(),
        vec![
            AgentEvent::token("Checking.", None),
            AgentEvent::tool_start("lookup", json!({"q": "brand voice"})),
        ],
    );

    let message = assembler.message();
    assert_eq!(message.tool_invocations.len(), 1);
    assert_eq!(message.tool_invocations[0].agent, TOOLS_PSEUDO_AGENT);
    assert_eq!(message.tool_invocations[0].status, ToolStatus::Running);

    let last = message.segments.last().unwrap();
    assert_eq!(last.agent, TOOLS_PSEUDO_AGENT);
    assert_eq!(last.tool_call_ids, vec!["call_0".to_string()]);
}

#[test]
fn test_late_tool_end_is_noop() {
    let mut assembler = TranscriptAssembler::replay(
        Message::assistant_placeholder(),
        vec![
            AgentEvent::delegate("seo_agent"),
            AgentEvent::tool_start("audit_site", json!({})),
            AgentEvent::tool_end("audit_site", json!({"score": 1})),
        ],
    );
    let before = assembler.message().clone();

    assembler.apply(AgentEvent::tool_end("audit_site", json!({"score": 99})));
    assembler.apply(AgentEvent::tool_end("never_started", json!(null)));

    let after = assembler.message();
    assert_eq!(before.tool_invocations, after.tool_invocations);
    assert_eq!(before.segments, after.segments);
    assert_eq!(after.tool_invocations[0].result, Some(json!({"score": 1})));
}

#[test]
fn test_tool_end_matches_most_recent_running_invocation() {
    let assembler = TranscriptAssembler::replay(
        Message::assistant_placeholder(),
        vec![
            AgentEvent::delegate("seo_agent"),
            AgentEvent::tool_start("crawl", json!({"url": "https://a.test"})),
            AgentEvent::tool_start("crawl", json!({"url": "https://b.test"})),
            AgentEvent::tool_end("crawl", json!("b done")),
        ],
    );

    let tools = &assembler.message().tool_invocations;
    assert_eq!(tools[0].status, ToolStatus::Running);
    assert_eq!(tools[1].status, ToolStatus::Complete);
    assert_eq!(tools[1].result, Some(json!("b done")));
}

#[test]
fn test_delegation_dedup() {
    let assembler = TranscriptAssembler::replay(
        Message::assistant_placeholder(),
        vec![AgentEvent::delegate("copywriter"), AgentEvent::delegate("copywriter")],
    );

    let delegations = &assembler.message().delegations;
    assert_eq!(delegations.len(), 1);
    assert_eq!(delegations[0].target, "copywriter");
    assert_eq!(delegations[0].status, DelegationStatus::Active);
}

#[test]
fn test_fail_from_outside_clears_streaming() {
    let mut assembler = TranscriptAssembler::new(Message::assistant_placeholder());
    assembler.apply(AgentEvent::token("half an ans", None));
    assembler.fail("connection reset");

    assert!(assembler.is_finalized());
    assert_eq!(assembler.message().content, "half an ans");
    assert_eq!(assembler.error(), Some("connection reset"));

    let parts = assembler.into_parts();
    assert_eq!(parts.error.as_deref(), Some("connection reset"));
    assert!(!parts.message.streaming);
}
