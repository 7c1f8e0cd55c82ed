//! Anthropic Messages API provider.
//!
//! Every prompt goes out as a single `user` turn whose content blocks are
//! text and base64 images; only the text blocks of the reply are kept.

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Content, Message, Role, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: usize = 4096;

/// Seconds to wait after a 429 that carries no hint.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RequestBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    encoding: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: usize,
    #[serde(default)]
    output_tokens: usize,
}

/// Flatten `content` into Messages API blocks, preserving part order.
fn push_blocks<'a>(content: &'a Content, blocks: &mut Vec<RequestBlock<'a>>) {
    match content {
        Content::Text { text } => blocks.push(RequestBlock::Text { text }),
        Content::Image { media_type, data } => blocks.push(RequestBlock::Image {
            source: ImageSource {
                encoding: "base64",
                media_type,
                data,
            },
        }),
        Content::MultiPart { parts } => {
            for part in parts {
                push_blocks(part, blocks);
            }
        }
    }
}

/// Client for the Anthropic Messages API.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    /// Reads the API key from the environment variable named by `config.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| LlmError::AuthFailed {
            provider: format!("Anthropic (env var '{}' not set)", config.api_key_env),
        })?;
        Ok(Self::with_key(config, api_key))
    }

    pub fn with_key(config: &LlmConfig, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: config.model.clone(),
        }
    }

    fn request_body<'a>(&'a self, request: &'a CompletionRequest) -> MessagesRequest<'a> {
        let messages = request
            .messages
            .iter()
            .map(|message| {
                let mut content = Vec::new();
                push_blocks(&message.content, &mut content);
                WireMessage {
                    role: message.role,
                    content,
                }
            })
            .collect();

        MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            messages,
        }
    }

    fn completion_from(&self, reply: MessagesResponse) -> CompletionResponse {
        let mut parts: Vec<Content> = reply
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(Content::Text { text }),
                ResponseBlock::Other => None,
            })
            .collect();

        let content = match parts.len() {
            0 => Content::text(""),
            1 => parts.remove(0),
            _ => Content::MultiPart { parts },
        };

        CompletionResponse {
            message: Message::new(Role::Assistant, content),
            usage: TokenUsage {
                input_tokens: reply.usage.input_tokens,
                output_tokens: reply.usage.output_tokens,
            },
            model: reply.model.unwrap_or_else(|| self.model.clone()),
            finish_reason: reply.stop_reason,
        }
    }

    fn parse_reply(&self, body: &str) -> Result<CompletionResponse, LlmError> {
        let reply: MessagesResponse =
            serde_json::from_str(body).map_err(|e| LlmError::ResponseParse {
                message: format!("Unexpected Messages API response: {}", e),
            })?;
        Ok(self.completion_from(reply))
    }

    fn status_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status {
            reqwest::StatusCode::UNAUTHORIZED => LlmError::AuthFailed {
                provider: "Anthropic".to_string(),
            },
            reqwest::StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
                retry_after_secs: serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v["error"]["retry_after_secs"].as_u64())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {} from Anthropic API: {}", status, body),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/messages", self.base_url);
        debug!(model = self.model.as_str(), url = url.as_str(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LlmError::Connection {
                        message: format!("Could not reach Anthropic API: {}", e),
                    }
                } else {
                    LlmError::ApiRequest {
                        message: format!("Request to Anthropic API failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::ResponseParse {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::status_error(status, &body));
        }
        self.parse_reply(&body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_vision(&self) -> bool {
        true
    }
}
