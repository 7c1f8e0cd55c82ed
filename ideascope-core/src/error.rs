//! Error types for the Ideascope core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the completion gateway, the web lookup gateway, configuration,
//! caller input, and propagated market-pipeline failures.

use crate::market::stages::MarketStage;

/// Top-level error type for the Ideascope core library.
#[derive(Debug, thiserror::Error)]
pub enum IdeaScopeError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Market analysis error: {0}")]
    Market(#[from] MarketError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from completion gateway (LLM provider) interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Unsupported provider: {provider}")]
    UnsupportedProvider { provider: String },
}

/// Errors from the web lookup gateway.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Search request failed: {message}")]
    Request { message: String },

    #[error("Failed to parse search response: {message}")]
    ResponseParse { message: String },

    #[error("Search timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Scoring weights must sum to 1.0, got {sum}")]
    WeightsNotNormalized { sum: f64 },
}

/// Malformed caller input, surfaced before any external call is made.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Required field '{field}' is empty")]
    EmptyField { field: &'static str },

    #[error("Field '{field}' is too long: {len} characters (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

/// A market pipeline stage failed under the `Propagate` policy.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: MarketStage,
        #[source]
        source: LlmError,
    },
}

/// A type alias for results using the top-level `IdeaScopeError`.
pub type Result<T> = std::result::Result<T, IdeaScopeError>;
