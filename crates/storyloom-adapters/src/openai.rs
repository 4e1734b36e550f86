//! OpenAI-compatible chat completion and embedding client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storyloom_core::error::DomainError;
use storyloom_core::services::{ChatMessage, CompletionService, EmbeddingService};
use tracing::{debug, instrument};

use crate::error::{AdapterError, truncate_body};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Connection settings for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer token.
    pub api_key: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Model used for completions.
    pub chat_model: String,
    /// Model used for embeddings.
    pub embedding_model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Settings with the default endpoint and models.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            chat_model: DEFAULT_CHAT_MODEL.to_owned(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_owned(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

const COMPLETION: &str = "completion";
const EMBEDDING: &str = "embedding";

/// HTTP client implementing both model ports.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::ClientSetup` if the TLS backend cannot start.
    pub fn new(config: OpenAiConfig) -> Result<Self, AdapterError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AdapterError::ClientSetup)?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn post<B, R>(&self, service: &'static str, path: &str, body: &B) -> Result<R, AdapterError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AdapterError::transport(service, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Status {
                service,
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|e| AdapterError::transport(service, e))
    }
}

fn first_choice(response: ChatCompletionResponse) -> Result<String, AdapterError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(AdapterError::EmptyResponse {
            service: COMPLETION,
            what: "message content",
        })
}

fn first_vector(response: EmbeddingResponse) -> Result<Vec<f32>, AdapterError> {
    response
        .data
        .into_iter()
        .next()
        .map(|data| data.embedding)
        .filter(|embedding| !embedding.is_empty())
        .ok_or(AdapterError::EmptyResponse {
            service: EMBEDDING,
            what: "vector",
        })
}

#[async_trait]
impl CompletionService for OpenAiClient {
    #[instrument(skip(self, messages), fields(model = %self.config.chat_model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, DomainError> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages,
        };
        let response: ChatCompletionResponse =
            self.post(COMPLETION, "chat/completions", &request).await?;
        let content = first_choice(response)?;
        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}

#[async_trait]
impl EmbeddingService for OpenAiClient {
    #[instrument(skip(self, text), fields(model = %self.config.embedding_model))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };
        let response: EmbeddingResponse = self.post(EMBEDDING, "embeddings", &request).await?;
        Ok(first_vector(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serializes_roles_in_lowercase() {
        // Arrange
        let messages = [
            ChatMessage::user("You are in a forest."),
            ChatMessage::assistant("Birds sing."),
        ];
        let request = ChatRequest {
            model: DEFAULT_CHAT_MODEL,
            messages: &messages,
        };

        // Act
        let json = serde_json::to_value(&request).unwrap();

        // Assert
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "user", "content": "You are in a forest."},
                    {"role": "assistant", "content": "Birds sing."}
                ]
            })
        );
    }

    #[test]
    fn test_first_choice_reads_message_content() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"The door creaks."},"finish_reason":"stop"}]}"#,
        )
        .unwrap();

        assert_eq!(first_choice(response).unwrap(), "The door creaks.");
    }

    #[test]
    fn test_missing_or_blank_content_is_empty_response() {
        let none: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        let null: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        let blank: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();

        for response in [none, null, blank] {
            assert!(matches!(
                first_choice(response),
                Err(AdapterError::EmptyResponse { .. })
            ));
        }
    }

    #[test]
    fn test_first_vector_reads_embedding() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.25,1.0]}],"model":"text-embedding-ada-002"}"#,
        )
        .unwrap();

        assert_eq!(first_vector(response).unwrap(), vec![0.5, -0.25, 1.0]);
    }

    #[test]
    fn test_empty_embedding_data_is_empty_response() {
        let response: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();

        assert!(matches!(
            first_vector(response),
            Err(AdapterError::EmptyResponse { service: "embedding", .. })
        ));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let mut config = OpenAiConfig::new("sk-test");
        config.base_url = "http://localhost:8080/v1/".to_owned();
        let client = OpenAiClient::new(config).unwrap();

        assert_eq!(
            client.endpoint("chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_upstream_error() {
        // Arrange
        let mut config = OpenAiConfig::new("sk-test");
        config.base_url = "http://127.0.0.1:9".to_owned();
        config.timeout = Duration::from_secs(2);
        let client = OpenAiClient::new(config).unwrap();

        // Act
        let result = client.embed("hello").await;

        // Assert
        assert!(result.is_err());
        assert!(result.unwrap_err().is_retryable());
    }
}
