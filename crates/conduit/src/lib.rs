//! # Conduit
//!
//! Streaming client for multi-agent conversations. An orchestrator agent
//! answers a user message over a server-sent event stream, delegating to
//! specialist agents and calling tools along the way; Conduit folds that
//! stream into one attributed assistant message and saves both sides of the
//! turn without ever blocking the chat on the persistence backend.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use conduit::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let tokens = Arc::new(EnvTokenProvider::new("CONDUIT_ACCESS_TOKEN"));
//!     let source = HttpEventSource::new("http://localhost:8000", tokens)?;
//!     let controller = SessionController::new(Arc::new(source));
//!
//!     let request = TurnRequest::new("strategist", "Audit acme.test");
//!     match controller.run(request, CancellationToken::new()).await {
//!         Ok(outcome) => {
//!             for segment in &outcome.message.segments {
//!                 println!("[{}] {}", segment.agent, segment.text);
//!             }
//!         }
//!         Err(failure) => eprintln!("turn failed: {}", failure),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`conduit-types`**: messages, segments, tool invocations, wire events, errors
//! - **`conduit-stream`**: line-buffered decoder turning a response body into events
//! - **`conduit-transcript`**: the state machine assembling events into a message
//! - **`conduit-session`**: one turn end to end, with cancellation and a deadline
//! - **`conduit-persist`**: message persistence, retry queue and tool-call compression
//!
//! ## License
//!
//! MIT

pub mod prelude;

pub use conduit_types::{
    AgentEvent, ConduitError, ConversationThread, Delegation, DelegationStatus, Message,
    MessageRole, Result, TextSegment, ToolInvocation, ToolStatus, DEFAULT_ORCHESTRATOR,
    FALLBACK_ERROR_TEXT, TOOLS_PSEUDO_AGENT,
};

pub use conduit_stream::{decode_event_stream, decode_response, EventStream, LineBuffer};

pub use conduit_transcript::{Step, TranscriptAssembler, TranscriptParts};

pub use conduit_session::{
    validate_input, CancellationToken, EnvTokenProvider, EventSource, HttpEventSource,
    SessionConfig, SessionController, SessionHandle, StaticTokenProvider, StreamRequest,
    TokenProvider, TurnFailure, TurnOutcome, TurnRequest,
};

pub use conduit_persist::{
    compress_tool_calls, FileStore, FlushReport, KeyValueStore, MemoryStore, MessageBackend,
    MessagePersistence, MessagePersistenceBuilder, RestBackend, RetryQueue, RetryQueueConfig,
    StoredMessage, ToolSummary,
};
