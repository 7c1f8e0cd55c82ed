//! Configuration system for Ideascope.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/ideascope/config.toml` and/or
//! `.ideascope/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::idea::dimension::Dimension;
use crate::idea::weights::WeightingTable;
use crate::market::stages::{FailurePolicy, MarketStage};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub lookup: LookupConfig,
    pub scoring: ScoringConfig,
    pub market: MarketConfig,
}

impl AppConfig {
    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "llm.timeout_secs must be greater than zero".into(),
            });
        }
        if self.lookup.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "lookup.timeout_secs must be greater than zero".into(),
            });
        }
        if self.scoring.report_limit > self.scoring.discovery_limit {
            return Err(ConfigError::Invalid {
                message: format!(
                    "scoring.report_limit ({}) exceeds scoring.discovery_limit ({})",
                    self.scoring.report_limit, self.scoring.discovery_limit
                ),
            });
        }
        if self.market.competitor_context > self.market.competitor_results {
            return Err(ConfigError::Invalid {
                message: format!(
                    "market.competitor_context ({}) exceeds market.competitor_results ({})",
                    self.market.competitor_context, self.market.competitor_results
                ),
            });
        }
        self.scoring.weighting_table()?;
        Ok(())
    }
}

/// Configuration for the completion gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name. Only "anthropic" is built in.
    pub provider: String,
    /// Model identifier (e.g., "claude-sonnet-4-20250514").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default temperature for generation.
    pub temperature: f32,
    /// Deadline applied to every completion call.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: None,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for the web lookup gateway and its call budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Backend name: "duckduckgo" (results page) or "duckduckgo_instant" (instant answer API).
    pub provider: String,
    /// Optional base URL override for the search endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub user_agent: String,
    /// Deadline applied to every lookup call.
    pub timeout_secs: u64,
    /// Maximum lookups per analysis run.
    pub max_web_searches: usize,
    /// Minimum spacing between two lookups of the same run, in milliseconds.
    pub cooldown_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            provider: "duckduckgo".to_string(),
            base_url: None,
            user_agent: format!("Ideascope/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
            max_web_searches: 3,
            cooldown_ms: 1000,
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Configuration for idea scoring and patent discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Output token cap for each factor evaluation.
    pub factor_max_tokens: usize,
    /// Output token cap for patent search-term extraction.
    pub terms_max_tokens: usize,
    /// How many extracted terms are looked up.
    pub max_patent_terms: usize,
    /// Results requested per patent lookup.
    pub results_per_term: usize,
    /// Cap on deduplicated patents kept by discovery (and used for risk).
    pub discovery_limit: usize,
    /// Cap on patents included in the caller-visible report.
    pub report_limit: usize,
    /// Optional override of the dimension weights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<BTreeMap<Dimension, f64>>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            factor_max_tokens: 1000,
            terms_max_tokens: 500,
            max_patent_terms: 3,
            results_per_term: 5,
            discovery_limit: 15,
            report_limit: 10,
            weights: None,
        }
    }
}

impl ScoringConfig {
    /// Resolve the weighting table, validating any override.
    pub fn weighting_table(&self) -> Result<WeightingTable, ConfigError> {
        match &self.weights {
            Some(weights) => WeightingTable::from_map(weights),
            None => Ok(WeightingTable::standard()),
        }
    }
}

/// Configuration for the market intelligence pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub segments_max_tokens: usize,
    pub personas_max_tokens: usize,
    pub competitors_max_tokens: usize,
    pub gaps_max_tokens: usize,
    pub positioning_max_tokens: usize,
    /// Results requested from the competitor lookup.
    pub competitor_results: usize,
    /// How many result titles are quoted in the competitor prompt.
    pub competitor_context: usize,
    /// Failure policy per stage.
    pub policies: StagePolicies,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            segments_max_tokens: 1200,
            personas_max_tokens: 1500,
            competitors_max_tokens: 2000,
            gaps_max_tokens: 800,
            positioning_max_tokens: 800,
            competitor_results: 8,
            competitor_context: 5,
            policies: StagePolicies::default(),
        }
    }
}

impl MarketConfig {
    pub fn max_tokens(&self, stage: MarketStage) -> usize {
        match stage {
            MarketStage::Segments => self.segments_max_tokens,
            MarketStage::Personas => self.personas_max_tokens,
            MarketStage::Competitors => self.competitors_max_tokens,
            MarketStage::Gaps => self.gaps_max_tokens,
            MarketStage::Positioning => self.positioning_max_tokens,
        }
    }
}

/// What each market stage does when the completion gateway fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePolicies {
    pub segments: FailurePolicy,
    pub personas: FailurePolicy,
    pub competitors: FailurePolicy,
    pub gaps: FailurePolicy,
    pub positioning: FailurePolicy,
}

impl Default for StagePolicies {
    fn default() -> Self {
        Self {
            segments: FailurePolicy::Isolate,
            personas: FailurePolicy::Isolate,
            competitors: FailurePolicy::Propagate,
            gaps: FailurePolicy::Propagate,
            positioning: FailurePolicy::Propagate,
        }
    }
}

impl StagePolicies {
    /// Every stage degrades to its default instead of failing the run.
    pub fn isolate_all() -> Self {
        Self {
            segments: FailurePolicy::Isolate,
            personas: FailurePolicy::Isolate,
            competitors: FailurePolicy::Isolate,
            gaps: FailurePolicy::Isolate,
            positioning: FailurePolicy::Isolate,
        }
    }

    pub fn for_stage(&self, stage: MarketStage) -> FailurePolicy {
        match stage {
            MarketStage::Segments => self.segments,
            MarketStage::Personas => self.personas,
            MarketStage::Competitors => self.competitors,
            MarketStage::Gaps => self.gaps,
            MarketStage::Positioning => self.positioning,
        }
    }
}

/// Load configuration with layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `IDEASCOPE_`)
/// 3. Workspace-local config (`.ideascope/config.toml`)
/// 4. User config (`~/.config/ideascope/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&AppConfig>,
) -> Result<AppConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "ideascope", "ideascope") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".ideascope").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (IDEASCOPE_LLM__MODEL, IDEASCOPE_LOOKUP__COOLDOWN_MS, etc.)
    figment = figment.merge(Env::prefixed("IDEASCOPE_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Check whether any Ideascope configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "ideascope", "ideascope") {
        if config_dir.config_dir().join("config.toml").exists() {
            return true;
        }
    }

    if let Some(ws) = workspace {
        if ws.join(".ideascope").join("config.toml").exists() {
            return true;
        }
    }

    false
}
