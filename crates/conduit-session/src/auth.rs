use async_trait::async_trait;
use conduit_types::{ConduitError, Result};

/// Source of the bearer token attached to stream requests
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, typically read once from configuration
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        if self.token.trim().is_empty() {
            return Err(ConduitError::Unauthenticated("no access token configured".to_string()));
        }
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every request, so a
/// rotated token is picked up without restarting.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn access_token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(ConduitError::Unauthenticated(format!("{} is not set", self.var))),
        }
    }
}
