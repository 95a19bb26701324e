use std::fmt::Display;
use std::pin::Pin;

use conduit_types::{
    AgentEvent, ConduitError, RawEvent, Result, DATA_PREFIX, STREAM_DONE_SENTINEL,
};
use futures::{Stream, StreamExt};
use reqwest::Response;
use tokio_util::sync::CancellationToken;

use crate::buffering::LineBuffer;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent>> + Send>>;

/// What a single text line of the body amounts to
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Blank, comment or non-data line
    Ignored,
    /// End-of-stream sentinel
    Done,
    Event(AgentEvent),
    /// Data line whose payload could not be decoded
    Malformed(String),
}

pub fn parse_data_line(line: &str) -> LineOutcome {
    let line = line.trim();
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Ignored;
    };
    let data = data.trim_start();

    if data == STREAM_DONE_SENTINEL {
        return LineOutcome::Done;
    }

    let raw = match serde_json::from_str::<RawEvent>(data) {
        Ok(raw) => raw,
        Err(e) => return LineOutcome::Malformed(format!("invalid JSON payload: {}", e)),
    };

    match AgentEvent::try_from(raw) {
        Ok(event) => LineOutcome::Event(event),
        Err(e) => LineOutcome::Malformed(e.to_string()),
    }
}

enum Read<T> {
    Aborted,
    Chunk(Option<T>),
}

/// Decode a response body into orchestration events.
///
/// `None` means the response carried no readable body. Events stop as soon
/// as `cancel` fires; the stream then yields a single `Cancelled` error.
pub fn decode_event_stream<S, B, E>(body: Option<S>, cancel: CancellationToken) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let Some(body) = body else {
            yield Err(ConduitError::EmptyBody);
            return;
        };

        let mut byte_chunks = Box::pin(body);
        let mut buffer = LineBuffer::with_capacity(4096);
        let mut received_bytes = false;

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => Read::Aborted,
                next = byte_chunks.next() => Read::Chunk(next),
            };

            let chunk = match read {
                Read::Aborted => {
                    tracing::debug!("event stream cancelled");
                    yield Err(ConduitError::Cancelled);
                    return;
                }
                Read::Chunk(None) => break,
                Read::Chunk(Some(Err(e))) => {
                    if cancel.is_cancelled() {
                        yield Err(ConduitError::Cancelled);
                    } else {
                        yield Err(ConduitError::NetworkFailure(format!("Stream error: {}", e)));
                    }
                    return;
                }
                Read::Chunk(Some(Ok(chunk))) => chunk,
            };

            {
                let bytes = chunk.as_ref();
                if bytes.is_empty() {
                    continue;
                }
                received_bytes = true;
                buffer.extend(bytes);
            }

            while let Some(line) = buffer.next_line() {
                if cancel.is_cancelled() {
                    yield Err(ConduitError::Cancelled);
                    return;
                }
                match parse_data_line(&line) {
                    LineOutcome::Ignored => {}
                    LineOutcome::Done => {
                        tracing::debug!("received end-of-stream sentinel");
                        return;
                    }
                    LineOutcome::Event(event) => yield Ok(event),
                    LineOutcome::Malformed(reason) => {
                        tracing::warn!(%reason, "skipping malformed stream event");
                    }
                }
            }
        }

        if !received_bytes {
            yield Err(ConduitError::EmptyBody);
            return;
        }

        // A final line without trailing newline is still an event
        if let Some(line) = buffer.take_remaining() {
            match parse_data_line(&line) {
                LineOutcome::Event(event) => yield Ok(event),
                LineOutcome::Malformed(reason) => {
                    tracing::warn!(%reason, "skipping malformed trailing stream event");
                }
                LineOutcome::Ignored | LineOutcome::Done => {}
            }
        }
    })
}

/// Decode the body of an HTTP response opened against the agent stream endpoint
pub fn decode_response(response: Response, cancel: CancellationToken) -> EventStream {
    let body = if response.content_length() == Some(0) {
        None
    } else {
        Some(response.bytes_stream())
    };
    decode_event_stream(body, cancel)
}
