use conduit_stream::{decode_event_stream, decode_response};
use conduit_types::{AgentEvent, ConduitError, Result};
use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

type Chunk = std::result::Result<Vec<u8>, std::io::Error>;

fn chunks(parts: &[&str]) -> futures::stream::Iter<std::vec::IntoIter<Chunk>> {
    let items: Vec<Chunk> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
    futures::stream::iter(items)
}

async fn collect(parts: &[&str]) -> Vec<Result<AgentEvent>> {
    decode_event_stream(Some(chunks(parts)), CancellationToken::new())
        .collect()
        .await
}

#[tokio::test]
async fn test_decodes_events_in_order() {
    let events = collect(&[
        "data: {\"event\":\"token\",\"content\":\"Hel\",\"metadata\":{\"langgraph_node\":\"writer\"}}\n",
        "data: {\"event\":\"token\",\"content\":\"lo\"}\n\n",
        "data: {\"event\":\"end\"}\n",
    ])
    .await;

    let events: Vec<AgentEvent> = events.into_iter().map(|e| e.unwrap()).collect();
    assert_eq!(
        events,
        vec![
            AgentEvent::token("Hel", Some("writer")),
            AgentEvent::token("lo", None),
            AgentEvent::End,
        ]
    );
}

#[tokio::test]
async fn test_partial_lines_survive_chunk_boundaries() {
    let events = collect(&[
        "data: {\"event\":\"tool_st",
        "art\",\"name\":\"crawl\",\"input\":{\"url\":\"https://a.io\"}}\nda",
        "ta: {\"event\":\"end\"}\n",
    ])
    .await;

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].as_ref().unwrap(),
        &AgentEvent::tool_start("crawl", json!({"url": "https://a.io"}))
    );
    assert_eq!(events[1].as_ref().unwrap(), &AgentEvent::End);
}

#[tokio::test]
async fn test_done_sentinel_stops_production() {
    let events = collect(&[
        "data: {\"event\":\"token\",\"content\":\"a\"}\n",
        "data: [DONE]\n",
        "data: {\"event\":\"token\",\"content\":\"never\"}\n",
    ])
    .await;

    assert_eq!(events.len(), 1);
    assert!(events[0].is_ok());
}

#[tokio::test]
async fn test_malformed_event_is_skipped() {
    let events = collect(&[
        "data: {broken\n",
        "data: {\"event\":\"unknown_kind\"}\n",
        "data: {\"event\":\"token\",\"content\":\"ok\"}\n",
    ])
    .await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().unwrap(), &AgentEvent::token("ok", None));
}

#[tokio::test]
async fn test_trailing_line_without_newline_is_processed() {
    let events = collect(&["data: {\"event\":\"thread_id\",\"content\":\"t-9\"}"]).await;

    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].as_ref().unwrap(),
        &AgentEvent::ThreadId { thread_id: "t-9".to_string() }
    );
}

#[tokio::test]
async fn test_missing_body_is_empty_body_error() {
    let events: Vec<_> = decode_event_stream(
        None::<futures::stream::Iter<std::vec::IntoIter<Chunk>>>,
        CancellationToken::new(),
    )
    .collect()
    .await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().unwrap_err(), &ConduitError::EmptyBody);
}

#[tokio::test]
async fn test_body_without_bytes_is_empty_body_error() {
    let events = collect(&[]).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().unwrap_err(), &ConduitError::EmptyBody);
}

#[tokio::test]
async fn test_read_failure_is_network_failure() {
    let items: Vec<Chunk> = vec![
        Ok(b"data: {\"event\":\"token\",\"content\":\"a\"}\n".to_vec()),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        Ok(b"data: {\"event\":\"end\"}\n".to_vec()),
    ];
    let events: Vec<_> = decode_event_stream(Some(futures::stream::iter(items)), CancellationToken::new())
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], Err(ConduitError::NetworkFailure(_))));
}

#[tokio::test]
async fn test_cancellation_stops_event_delivery() {
    let cancel = CancellationToken::new();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Chunk>();
    let body = tokio_stream_from(rx);
    let mut stream = decode_event_stream(Some(body), cancel.clone());

    tx.send(Ok(b"data: {\"event\":\"token\",\"content\":\"first\"}\n".to_vec())).unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), AgentEvent::token("first", None));

    cancel.cancel();
    tx.send(Ok(b"data: {\"event\":\"token\",\"content\":\"late\"}\n".to_vec())).unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap_err(), ConduitError::Cancelled);
    assert!(stream.next().await.is_none());
}

fn tokio_stream_from(
    rx: tokio::sync::mpsc::UnboundedReceiver<Chunk>,
) -> impl futures::Stream<Item = Chunk> + Send + 'static {
    futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (chunk, rx)) })
}

#[tokio::test]
async fn test_decode_http_response() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"event\":\"delegate\",\"name\":\"seo_agent\"}\n\n",
        "data: {\"event\":\"end\"}\n\n",
    );
    let mock = server
        .mock("GET", "/stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let response = reqwest::get(format!("{}/stream", server.url())).await.unwrap();
    let events: Vec<_> = decode_response(response, CancellationToken::new())
        .map(|e| e.unwrap())
        .collect()
        .await;

    mock.assert_async().await;
    assert_eq!(events, vec![AgentEvent::delegate("seo_agent"), AgentEvent::End]);
}

#[tokio::test]
async fn test_decode_http_response_without_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/stream")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let response = reqwest::get(format!("{}/stream", server.url())).await.unwrap();
    let events: Vec<_> = decode_response(response, CancellationToken::new()).collect().await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().unwrap_err(), &ConduitError::EmptyBody);
}
