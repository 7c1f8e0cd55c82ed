//! Brain module: the completion gateway abstraction.
//!
//! Defines the `LlmProvider` trait for model-agnostic completions and the
//! `Brain` wrapper that every pipeline stage talks to. `Brain` turns a prompt
//! into a single completion request and enforces a per-call deadline, so a
//! hung provider surfaces as `LlmError::Timeout` instead of stalling a run.

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Content, Message, TokenUsage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Trait for completion providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;

    /// Whether this provider supports vision/image inputs.
    fn supports_vision(&self) -> bool {
        false
    }
}

/// Prompt-level front end over an `LlmProvider`.
#[derive(Clone)]
pub struct Brain {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
    temperature: f32,
}

impl Brain {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a single-turn prompt and return the model's text.
    pub async fn ask(&self, prompt: &str, max_tokens: usize) -> Result<String, LlmError> {
        self.send(Message::user(prompt), max_tokens).await
    }

    /// Send a prompt together with image attachments.
    pub async fn ask_with_images(
        &self,
        prompt: &str,
        images: Vec<Content>,
        max_tokens: usize,
    ) -> Result<String, LlmError> {
        if !images.is_empty() && !self.provider.supports_vision() {
            return Err(LlmError::ApiRequest {
                message: format!(
                    "Model '{}' does not accept image inputs",
                    self.provider.model_name()
                ),
            });
        }
        self.send(Message::user_with_images(prompt, images), max_tokens)
            .await
    }

    async fn send(&self, message: Message, max_tokens: usize) -> Result<String, LlmError> {
        let request = CompletionRequest {
            messages: vec![message],
            temperature: self.temperature,
            max_tokens: Some(max_tokens),
        };

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })??;

        debug!(
            model = response.model.as_str(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total(),
            finish_reason = response.finish_reason.as_deref(),
            "Completion received"
        );

        Ok(response.text())
    }
}

/// A scripted reply for `MockLlmProvider`.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(String),
    /// Sleep before replying with the text.
    Delayed(Duration, String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        MockReply::Error(message.into())
    }
}

/// A mock provider for tests.
///
/// Replies are chosen in order: the first rule whose needle occurs in the
/// prompt, then the next queued reply, then the default reply. Every prompt
/// is recorded so tests can assert on what was sent.
pub struct MockLlmProvider {
    model: String,
    rules: Vec<(String, MockReply)>,
    queue: Mutex<VecDeque<MockReply>>,
    default_reply: MockReply,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            rules: Vec::new(),
            queue: Mutex::new(VecDeque::new()),
            default_reply: MockReply::text("I'm a mock LLM. No queued responses available."),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a MockLlmProvider that always returns the given text.
    pub fn with_response(text: &str) -> Self {
        Self::new().with_default(MockReply::text(text))
    }

    /// Create a MockLlmProvider whose every call fails.
    pub fn failing(message: &str) -> Self {
        Self::new().with_default(MockReply::error(message))
    }

    pub fn with_default(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Reply with `reply` whenever the prompt contains `needle`.
    pub fn on(mut self, needle: impl Into<String>, reply: MockReply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    /// Queue a reply for the next call that matches no rule.
    pub fn queue_reply(&self, reply: MockReply) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("end_turn".to_string()),
        }
    }

    fn pick_reply(&self, prompt: &str) -> MockReply {
        if let Some((_, reply)) = self.rules.iter().find(|(needle, _)| prompt.contains(needle)) {
            return reply.clone();
        }
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.joined_text())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.clone());

        match self.pick_reply(&prompt) {
            MockReply::Text(text) => Ok(Self::text_response(&text)),
            MockReply::Error(message) => Err(LlmError::Connection { message }),
            MockReply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(Self::text_response(&text))
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_vision(&self) -> bool {
        true
    }
}
