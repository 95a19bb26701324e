//! Conversation session control: one streamed turn per call, with a shared
//! abort token for caller cancellation and the wall-clock deadline.

mod auth;
mod config;
mod controller;
mod source;

pub use auth::{EnvTokenProvider, StaticTokenProvider, TokenProvider};
pub use config::SessionConfig;
pub use controller::{
    validate_input, SessionController, SessionHandle, TurnFailure, TurnOutcome, TurnRequest,
};
pub use source::{EventSource, HttpEventSource, StreamConfig, StreamRequest};

// Re-exported so callers can build tokens without depending on tokio-util
pub use tokio_util::sync::CancellationToken;
