use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("response contained no text")]
    EmptyResponse,
}

/// A service that completes one prompt with text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, QueryError>;
}

/// Credentials and model settings, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub max_tokens: u32,
}

#[derive(Serialize)]
struct MessageContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<MessageContent<'a>>,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    client: Client,
    config: AiConfig,
}

impl AnthropicClient {
    pub fn new(config: AiConfig) -> Self {
        AnthropicClient {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, QueryError> {
        let request = ApiRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: vec![MessageContent {
                    content_type: "text",
                    text: prompt,
                }],
            }],
        };

        debug!(model = %self.config.model, prompt_len = prompt.len(), "sending query");
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|err| err.error.message)
                .unwrap_or(body);
            return Err(QueryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ApiResponse = response.json().await?;
        let text: String = body
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(QueryError::EmptyResponse);
        }
        Ok(text)
    }
}
