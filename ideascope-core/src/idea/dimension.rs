//! Scoring dimensions and per-dimension results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One axis on which an idea is scored.
///
/// Every dimension except `PatentRisk` is scored by a factor evaluator;
/// patent risk comes from patent discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Novelty,
    TechnicalFeasibility,
    MarketOverlap,
    PatentRisk,
    ImplementationComplexity,
    EthicalRegulatory,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Novelty,
        Dimension::TechnicalFeasibility,
        Dimension::MarketOverlap,
        Dimension::PatentRisk,
        Dimension::ImplementationComplexity,
        Dimension::EthicalRegulatory,
    ];

    /// Dimensions scored through the completion gateway.
    pub const EVALUATED: [Dimension; 5] = [
        Dimension::Novelty,
        Dimension::TechnicalFeasibility,
        Dimension::MarketOverlap,
        Dimension::ImplementationComplexity,
        Dimension::EthicalRegulatory,
    ];

    /// Stable snake_case key, as used in reports and config.
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Novelty => "novelty",
            Dimension::TechnicalFeasibility => "technical_feasibility",
            Dimension::MarketOverlap => "market_overlap",
            Dimension::PatentRisk => "patent_risk",
            Dimension::ImplementationComplexity => "implementation_complexity",
            Dimension::EthicalRegulatory => "ethical_regulatory",
        }
    }

    /// Human-readable phrase used in explanations.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Novelty => "novelty",
            Dimension::TechnicalFeasibility => "technical feasibility",
            Dimension::MarketOverlap => "market overlap",
            Dimension::PatentRisk => "patent risk",
            Dimension::ImplementationComplexity => "implementation complexity",
            Dimension::EthicalRegulatory => "ethical/regulatory concerns",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Neutral score substituted when a dimension cannot be evaluated.
pub const NEUTRAL_SCORE: f64 = 5.0;

/// The score and reasoning for one dimension in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub dimension: Dimension,
    /// Always within `[0, 10]`.
    pub score: f64,
    pub explanation: String,
}

impl FactorScore {
    /// Create a score, clamping it into `[0, 10]`. Non-finite values become neutral.
    pub fn new(dimension: Dimension, score: f64, explanation: impl Into<String>) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 10.0)
        } else {
            NEUTRAL_SCORE
        };
        Self {
            dimension,
            score,
            explanation: explanation.into(),
        }
    }

    /// The neutral result used when evaluation fails.
    pub fn fallback(dimension: Dimension) -> Self {
        Self::new(
            dimension,
            NEUTRAL_SCORE,
            format!("Unable to analyze {} at this time.", dimension.label()),
        )
    }
}
