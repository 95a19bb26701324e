use std::sync::Arc;

use async_trait::async_trait;
use conduit_persist::ensure_success;
use conduit_stream::{decode_response, EventStream};
use conduit_types::{ConduitError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::auth::TokenProvider;

/// One user turn addressed to an agent endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamRequest {
    #[serde(skip)]
    pub agent_id: String,
    pub message: String,
    pub config: StreamConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamConfig {
    pub thread_id: String,
}

impl StreamRequest {
    pub fn new(agent_id: impl Into<String>, thread_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            message: message.into(),
            config: StreamConfig {
                thread_id: thread_id.into(),
            },
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.config.thread_id
    }
}

/// Opens the event stream for one turn. The returned stream must stop
/// producing events once `cancel` fires.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn open(&self, request: &StreamRequest, cancel: CancellationToken) -> Result<EventStream>;
}

/// Streams agent events over HTTP from `{base_url}/agents/{agent_id}/stream`
pub struct HttpEventSource {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpEventSource {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        // No client-wide timeout: the session deadline bounds the whole stream.
        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ConduitError::NetworkFailure(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, agent_id: &str) -> String {
        format!("{}/agents/{}/stream", self.base_url, agent_id)
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn open(&self, request: &StreamRequest, cancel: CancellationToken) -> Result<EventStream> {
        let token = self.tokens.access_token().await?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ConduitError::Unauthenticated("Invalid access token format".to_string()))?;

        tracing::debug!(agent_id = %request.agent_id, thread_id = %request.thread_id(), "opening agent stream");

        let send = self
            .http_client
            .post(self.endpoint(&request.agent_id))
            .header(AUTHORIZATION, auth)
            .json(request)
            .send();

        // Dropping the pending request aborts the connection.
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConduitError::Cancelled),
            response = send => response
                .map_err(|e| ConduitError::NetworkFailure(format!("Failed to send request: {}", e)))?,
        };

        let response = ensure_success(response).await?;
        Ok(decode_response(response, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let request = StreamRequest::new("strategist", "t-1", "hello");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"message": "hello", "config": {"thread_id": "t-1"}})
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let source = HttpEventSource::new("http://localhost:8000/", Arc::new(StaticTokenProvider::new("t"))).unwrap();
        assert_eq!(source.endpoint("seo"), "http://localhost:8000/agents/seo/stream");
    }
}
