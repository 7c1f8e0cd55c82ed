//! Idea scoring: per-dimension evaluation, patent discovery, weighted total.

pub mod dimension;
pub mod evaluator;
pub mod patents;
pub mod scorer;
pub mod weights;

pub use dimension::{Dimension, FactorScore};
pub use evaluator::FactorEvaluator;
pub use patents::{PatentDiscovery, PatentRecord, assess_patent_risk};
pub use scorer::{AnalysisRequest, IdeaScorer, WeightedReport};
pub use weights::WeightingTable;
