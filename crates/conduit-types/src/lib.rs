pub mod error;
pub mod events;
pub mod message;
pub mod thread;

pub use error::{ConduitError, Result};
pub use events::{AgentEvent, EventMetadata, RawEvent};
pub use message::{
    Delegation, DelegationStatus, Message, MessageRole, TextSegment, ToolInvocation, ToolStatus,
};
pub use thread::ConversationThread;

/// Agent identity used when an event carries no attribution
pub const DEFAULT_ORCHESTRATOR: &str = "orchestrator";

/// Pseudo-agent owning tool calls that cannot be attributed
pub const TOOLS_PSEUDO_AGENT: &str = "tools";

/// Prefix of lines carrying event payloads
pub const DATA_PREFIX: &str = "data:";

/// Literal payload that ends the stream
pub const STREAM_DONE_SENTINEL: &str = "[DONE]";

/// Content shown when the stream fails before producing any text
pub const FALLBACK_ERROR_TEXT: &str = "Sorry, something went wrong while generating a response. Please try again.";
