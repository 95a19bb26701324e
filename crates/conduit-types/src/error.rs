use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConduitError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stream opened without a readable body")]
    EmptyBody,

    #[error("Stream cancelled")]
    Cancelled,

    #[error("Stream exceeded the {0:?} time budget")]
    Timeout(Duration),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Backend error ({status}): {message}")]
    BackendError { status: u16, message: String },

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// The agent backend reported a failure inside the event stream
    #[error("Agent error: {0}")]
    AgentError(String),
}

impl ConduitError {
    /// Whether a later attempt with the same payload can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConduitError::NetworkFailure(_) | ConduitError::PersistenceFailure(_) => true,
            ConduitError::BackendError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Session-level errors end the turn and are shown in the transcript.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, ConduitError::PersistenceFailure(_) | ConduitError::Decode(_))
    }
}

pub type Result<T> = std::result::Result<T, ConduitError>;
