//! REST client for the chat server.
//!
//! Wraps the endpoints the frontends use: model list, session directory,
//! session detail, history, delete, model change, and message send. The
//! controller talks to this through the `ChatTransport` trait so tests can
//! substitute a mock.

use async_trait::async_trait;
use serde::Deserialize;

use crate::protocol::{SendMessageRequest, SendMessageResponse};
use crate::state::{ChatMessage, SessionDetail, SessionSummary};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Api(String),
}

/// The REST operations the controller needs. Implemented by `ApiClient`;
/// tests implement it with canned responses.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn list_models(&self) -> Result<Vec<String>, ApiError>;
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ApiError>;
    async fn session_detail(&self, id: &str) -> Result<SessionDetail, ApiError>;
    async fn history(&self, id: &str) -> Result<Vec<ChatMessage>, ApiError>;
    async fn delete_session(&self, id: &str) -> Result<(), ApiError>;
    async fn change_model(&self, id: &str, model: &str) -> Result<(), ApiError>;
    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ApiError>;
}

/// HTTP client for the chat server REST API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SessionsResponse {
    sessions: Option<Vec<SessionSummary>>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    messages: Option<Vec<ChatMessage>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(res: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Api(format!("{} {}", status, body)));
        }
        Ok(res)
    }
}

#[async_trait]
impl ChatTransport for ApiClient {
    /// GET /models — available model identifiers.
    async fn list_models(&self) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/models", self.base_url);
        let res = Self::check(self.client.get(&url).send().await?).await?;
        let data: ModelsResponse = res.json().await?;
        Ok(data.models.unwrap_or_default())
    }

    /// GET /sessions — the full session directory.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ApiError> {
        let url = format!("{}/sessions", self.base_url);
        let res = Self::check(self.client.get(&url).send().await?).await?;
        let data: SessionsResponse = res.json().await?;
        Ok(data.sessions.unwrap_or_default())
    }

    /// GET /session/{id} — title and stored model.
    async fn session_detail(&self, id: &str) -> Result<SessionDetail, ApiError> {
        let url = format!("{}/session/{}", self.base_url, id);
        let res = Self::check(self.client.get(&url).send().await?).await?;
        Ok(res.json().await?)
    }

    /// GET /history/{id} — message history in order.
    async fn history(&self, id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let url = format!("{}/history/{}", self.base_url, id);
        let res = Self::check(self.client.get(&url).send().await?).await?;
        let data: HistoryResponse = res.json().await?;
        Ok(data.messages.unwrap_or_default())
    }

    /// DELETE /session/{id} — any 2xx counts as success, body ignored.
    async fn delete_session(&self, id: &str) -> Result<(), ApiError> {
        let url = format!("{}/session/{}", self.base_url, id);
        Self::check(self.client.delete(&url).send().await?).await?;
        Ok(())
    }

    /// POST /session/{id}/change-model?model=... — persist the session's model.
    async fn change_model(&self, id: &str, model: &str) -> Result<(), ApiError> {
        let url = format!("{}/session/{}/change-model", self.base_url, id);
        Self::check(
            self.client
                .post(&url)
                .query(&[("model", model)])
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    /// POST /send-message — the reply arrives later over the socket.
    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ApiError> {
        let url = format!("{}/send-message", self.base_url);
        let res = Self::check(self.client.post(&url).json(request).send().await?).await?;
        Ok(res.json().await?)
    }
}
