use async_trait::async_trait;
use conduit_types::{ConduitError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Response;
use serde::Deserialize;
use std::time::Duration;

use crate::backend::MessageBackend;
use crate::models::{NewMessage, StoredMessage};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// REST client for the message tables of the backend-as-a-service
pub struct RestBackend {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error", alias = "msg")]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryBody {
    Wrapped { messages: Vec<StoredMessage> },
    Bare(Vec<StoredMessage>),
}

impl RestBackend {
    /// Create a client authenticated with the backend's API key
    pub fn new(base_url: impl Into<String>, api_key: impl AsRef<str>) -> Result<Self> {
        let api_key = api_key.as_ref();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| ConduitError::InvalidInput("Invalid API key format".to_string()))?,
        );
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key)
                .map_err(|_| ConduitError::InvalidInput("Invalid API key format".to_string()))?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConduitError::NetworkFailure(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .map_err(|e| ConduitError::NetworkFailure(format!("Failed to send request: {}", e)))
    }
}

/// Turn a non-success response into `BackendError`, keeping the server's message
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);

    Err(ConduitError::BackendError {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl MessageBackend for RestBackend {
    async fn save_message(&self, message: &NewMessage) -> Result<StoredMessage> {
        let response = self
            .send(self.http_client.post(format!("{}/messages", self.base_url)).json(message))
            .await?;
        let response = ensure_success(response).await?;

        response
            .json()
            .await
            .map_err(|e| ConduitError::Decode(format!("Failed to parse saved message: {}", e)))
    }

    async fn load_history(&self, thread_id: &str) -> Result<Vec<StoredMessage>> {
        let response = self
            .send(self.http_client.get(format!("{}/threads/{}/messages", self.base_url, thread_id)))
            .await?;
        let response = ensure_success(response).await?;

        let body: HistoryBody = response
            .json()
            .await
            .map_err(|e| ConduitError::Decode(format!("Failed to parse history: {}", e)))?;

        Ok(match body {
            HistoryBody::Wrapped { messages } => messages,
            HistoryBody::Bare(messages) => messages,
        })
    }

    async fn save_batch(&self, messages: &[NewMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let response = self
            .send(
                self.http_client
                    .post(format!("{}/messages/batch", self.base_url))
                    .json(&serde_json::json!({ "messages": messages })),
            )
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
