//! Market intelligence: a five-stage sequential pipeline.

pub mod analyzer;
pub mod stages;
pub mod types;

pub use analyzer::MarketAnalyzer;
pub use stages::{FailurePolicy, MarketStage};
pub use types::{
    CompetitorMap, CustomerPersona, CustomerSegment, DirectCompetitor, MarketReport,
    MarketRequest, RelatedCompetitor, SegmentSize,
};
