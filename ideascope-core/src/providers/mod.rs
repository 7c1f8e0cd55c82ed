//! Completion gateway implementations.
//!
//! Use `create_provider()` to instantiate the provider named in config.

pub mod anthropic;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;

pub use anthropic::AnthropicProvider;

/// Create the configured completion provider.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider.to_ascii_lowercase().as_str() {
        "anthropic" | "claude" => Ok(Arc::new(AnthropicProvider::new(config)?)),
        other => Err(LlmError::UnsupportedProvider {
            provider: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_unsupported() {
        let config = LlmConfig {
            provider: "palm".into(),
            ..LlmConfig::default()
        };
        match create_provider(&config) {
            Err(LlmError::UnsupportedProvider { provider }) => assert_eq!(provider, "palm"),
            Err(other) => panic!("Expected UnsupportedProvider, got {:?}", other),
            Ok(_) => panic!("Expected an error"),
        }
    }

    #[test]
    fn test_create_provider_anthropic() {
        let env_var = "IDEASCOPE_CREATE_PROVIDER_TEST_KEY";
        unsafe { std::env::set_var(env_var, "sk-ant-test") };
        let config = LlmConfig {
            provider: "Anthropic".into(),
            api_key_env: env_var.into(),
            ..LlmConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "claude-sonnet-4-20250514");
        unsafe { std::env::remove_var(env_var) };
    }
}
