//! # Ideascope Core
//!
//! Core library for Ideascope.
//! Provides idea scoring (factor evaluation, patent discovery, weighted
//! aggregation), the market intelligence pipeline, the completion and web
//! lookup gateways they depend on, configuration, and fundamental types.

pub mod brain;
pub mod budget;
pub mod config;
pub mod error;
pub mod extract;
pub mod idea;
pub mod lookup;
pub mod market;
pub mod providers;
pub mod types;

// Re-export commonly used types at the crate root.
pub use brain::{Brain, LlmProvider, MockLlmProvider, MockReply};
pub use budget::{SearchBudget, SearchPermit};
pub use config::{AppConfig, LlmConfig, LookupConfig, MarketConfig, ScoringConfig, StagePolicies};
pub use error::{IdeaScopeError, Result};
pub use extract::{Extraction, JsonShape};
pub use idea::{
    AnalysisRequest, Dimension, FactorScore, IdeaScorer, PatentRecord, WeightedReport,
    WeightingTable,
};
pub use lookup::{MockWebLookup, SearchHit, Searcher, WebLookup};
pub use market::{FailurePolicy, MarketAnalyzer, MarketReport, MarketRequest, MarketStage};
pub use types::{CompletionRequest, CompletionResponse, Content, Message, Role, TokenUsage};
