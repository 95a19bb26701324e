use std::time::Duration;

use conduit_types::DEFAULT_ORCHESTRATOR;
use serde::{Deserialize, Serialize};

/// Limits applied to every turn run by a [`crate::SessionController`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on user message length, in characters
    pub max_message_len: usize,
    /// Wall-clock budget for opening and draining one stream
    pub timeout: Duration,
    /// Agent that owns unattributed text
    pub orchestrator_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_message_len: 10_000,
            timeout: Duration::from_secs(300),
            orchestrator_id: DEFAULT_ORCHESTRATOR.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_orchestrator(mut self, orchestrator_id: impl Into<String>) -> Self {
        self.orchestrator_id = orchestrator_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_message_len, 10_000);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.orchestrator_id, "orchestrator");
    }

    #[test]
    fn test_builder_overrides() {
        let config = SessionConfig::new()
            .with_max_message_len(20)
            .with_timeout(Duration::from_millis(50))
            .with_orchestrator("supervisor");
        assert_eq!(config.max_message_len, 20);
        assert_eq!(config.timeout, Duration::from_millis(50));
        assert_eq!(config.orchestrator_id, "supervisor");
    }
}
