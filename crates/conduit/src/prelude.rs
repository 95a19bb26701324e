//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use conduit::prelude::*;
//! ```

pub use crate::{
    AgentEvent, CancellationToken, ConduitError, ConversationThread, EnvTokenProvider,
    EventSource, HttpEventSource, Message, MessagePersistence, MessageRole, SessionConfig,
    SessionController, StaticTokenProvider, TextSegment, ToolInvocation, ToolStatus,
    TranscriptAssembler, TurnFailure, TurnOutcome, TurnRequest,
};
