use config::{Config as ConfigLoader, ConfigError, Environment, File};
use conduit_persist::RetryQueueConfig;
use conduit_session::SessionConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ACCESS_TOKEN_VAR: &str = "CONDUIT_ACCESS_TOKEN";
pub const BACKEND_KEY_VAR: &str = "CONDUIT_BACKEND_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub session: SessionSettings,
    pub queue: QueueSettings,
    #[serde(default)]
    pub history: HistoryConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub backend_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the agent streaming service
    pub agent_url: String,
    /// Base URL of the message persistence API
    pub persistence_url: String,
    pub agent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub timeout_secs: u64,
    pub max_message_len: usize,
    pub orchestrator: String,
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        SessionConfig::new()
            .with_timeout(Duration::from_secs(settings.timeout_secs))
            .with_max_message_len(settings.max_message_len)
            .with_orchestrator(settings.orchestrator.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    pub dir: PathBuf,
    pub max_entries: usize,
    pub max_retries: u32,
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

impl From<&QueueSettings> for RetryQueueConfig {
    fn from(settings: &QueueSettings) -> Self {
        RetryQueueConfig::default()
            .with_max_entries(settings.max_entries)
            .with_max_retries(settings.max_retries)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub thread_id: String,
}

impl HistoryConfig {
    /// Thread to resume at startup, if any
    pub fn resume_thread(&self) -> Option<&str> {
        let id = self.thread_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. CONDUIT_<SECTION>__<KEY> environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CONDUIT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Secrets never come from TOML
        cfg.backend_key = std::env::var(BACKEND_KEY_VAR).ok().filter(|k| !k.trim().is_empty());

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [backend]
        agent_url = "http://localhost:8000"
        persistence_url = "http://localhost:54321/rest/v1"
        agent_id = "strategist"

        [session]
        timeout_secs = 120
        max_message_len = 2000
        orchestrator = "supervisor"

        [queue]
        dir = "/tmp/conduit"
        max_entries = 20
        max_retries = 5

        [logging]
        level = "debug"
        format = "json"
    "#;

    #[test]
    fn test_config_structure() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.backend.agent_id, "strategist");
        assert_eq!(config.queue.quota_bytes, None);
        assert!(config.history.resume_thread().is_none());
        assert!(config.backend_key.is_none());
    }

    #[test]
    fn test_session_settings_conversion() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let session = SessionConfig::from(&config.session);
        assert_eq!(session.timeout, Duration::from_secs(120));
        assert_eq!(session.max_message_len, 2000);
        assert_eq!(session.orchestrator_id, "supervisor");

        let queue = RetryQueueConfig::from(&config.queue);
        assert_eq!(queue.max_entries, 20);
        assert_eq!(queue.max_retries, 5);
    }

    #[test]
    fn test_blank_history_thread_is_ignored() {
        let history = HistoryConfig { thread_id: "  ".to_string() };
        assert!(history.resume_thread().is_none());

        let history = HistoryConfig { thread_id: "t-1".to_string() };
        assert_eq!(history.resume_thread(), Some("t-1"));
    }

    #[test]
    fn test_shipped_default_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.session.timeout_secs, 300);
        assert_eq!(config.queue.max_entries, 50);
    }
}
