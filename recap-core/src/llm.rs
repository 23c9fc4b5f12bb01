//! Language-model access for the analysis pipeline.
//!
//! Provides a `CompletionBackend` trait with an OpenAI-compatible
//! `chat/completions` implementation. Calls carry a bounded client timeout
//! and retry with exponential backoff; callers above the Summarization
//! Engine never see these errors — they degrade to "no result".

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

// ============================================================================
// CompletionBackend trait
// ============================================================================

/// Per-call model parameters; each pipeline call type (summary, keywords)
/// carries its own.
#[derive(Debug, Clone, Copy)]
pub struct CallParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Abstraction over completion providers.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Produce a free-text completion for the prompt.
    async fn complete(&self, prompt: &str, params: &CallParams)
        -> Result<String, CompletionError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

/// Completion call errors
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Response contained no completion text")]
    EmptyResponse,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl CompletionConfig {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model,
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

// ============================================================================
// OpenAI chat API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiCompletionClient
// ============================================================================

/// Completion client for OpenAI-compatible `chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    config: CompletionConfig,
    base_url: String,
}

impl OpenAiCompletionClient {
    pub fn new(config: CompletionConfig, base_url: String) -> Result<Self, CompletionError> {
        if config.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Run the completion with retries; any persistent failure collapses to
    /// `RetryExhausted`.
    pub async fn complete_raw(
        &self,
        prompt: &str,
        params: &CallParams,
    ) -> Result<String, CompletionError> {
        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        let result = Retry::spawn(retry_strategy, || self.complete_once(prompt, params)).await;

        match result {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::error!(
                    attempts = self.config.max_retries,
                    error = %e,
                    "All completion retry attempts failed"
                );
                Err(CompletionError::RetryExhausted {
                    attempts: self.config.max_retries,
                })
            }
        }
    }

    async fn complete_once(
        &self,
        prompt: &str,
        params: &CallParams,
    ) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Completion API error");

            return Err(CompletionError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        params: &CallParams,
    ) -> Result<String, CompletionError> {
        self.complete_raw(prompt, params).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str) -> CompletionConfig {
        CompletionConfig {
            api_key: api_key.to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 5,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }

    fn test_params() -> CallParams {
        CallParams {
            max_tokens: 500,
            temperature: 0.5,
            top_p: 0.95,
        }
    }

    fn mock_chat_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": text } }
            ]
        })
    }

    #[tokio::test]
    async fn test_complete_calls_api_and_returns_text() {
        let mock_server = MockServer::start().await;
        let client = OpenAiCompletionClient::new(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-api-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(mock_chat_response("  a summary  ")),
            )
            .mount(&mock_server)
            .await;

        let result = client.complete_raw("summarize this", &test_params()).await;

        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result.err());
        assert_eq!(result.unwrap(), "a summary", "Response must be trimmed");
    }

    #[tokio::test]
    async fn test_complete_returns_error_on_api_500() {
        let mock_server = MockServer::start().await;
        let client = OpenAiCompletionClient::new(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": { "message": "Internal server error" }
            })))
            .mount(&mock_server)
            .await;

        let result = client.complete_raw("summarize this", &test_params()).await;

        assert!(result.is_err(), "Expected error on 500 response");
        match result {
            Err(CompletionError::RetryExhausted { attempts }) => {
                assert_eq!(attempts, 3, "Expected 3 retry attempts");
            }
            _ => panic!("Expected RetryExhausted error"),
        }
    }

    #[tokio::test]
    async fn test_complete_retries_on_429_then_succeeds() {
        let mock_server = MockServer::start().await;
        let client = OpenAiCompletionClient::new(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit exceeded" }
            })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_chat_response("recovered")))
            .mount(&mock_server)
            .await;

        let result = client.complete_raw("summarize this", &test_params()).await;

        assert!(result.is_ok(), "Expected success after retry");
        assert_eq!(result.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn test_client_fails_with_missing_api_key() {
        let config = test_config("");
        let result = OpenAiCompletionClient::new(config, "http://localhost".to_string());

        assert!(result.is_err(), "Expected error with missing API key");
        match result {
            Err(CompletionError::MissingApiKey) => {}
            _ => panic!("Expected MissingApiKey error"),
        }
    }

    #[tokio::test]
    async fn test_complete_errors_on_empty_choices() {
        let mock_server = MockServer::start().await;
        let client = OpenAiCompletionClient::new(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&mock_server)
            .await;

        let result = client.complete_raw("summarize this", &test_params()).await;

        assert!(result.is_err(), "Expected error on empty choices");
        match result {
            Err(CompletionError::RetryExhausted { .. }) => {}
            Err(CompletionError::EmptyResponse) => {}
            _ => panic!("Expected RetryExhausted or EmptyResponse error"),
        }
    }
}
