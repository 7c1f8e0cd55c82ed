//! Idea scoring coordinator.
//!
//! Fans out the five factor evaluators and patent discovery concurrently,
//! then folds the per-dimension scores into the weighted total. Every stage
//! degrades to a neutral default on failure, so a validated request always
//! produces a complete report.

use super::dimension::{Dimension, FactorScore};
use super::evaluator::FactorEvaluator;
use super::patents::{PatentDiscovery, PatentRecord};
use super::weights::WeightingTable;
use crate::brain::Brain;
use crate::budget::SearchBudget;
use crate::config::{AppConfig, LookupConfig};
use crate::error::{ConfigError, InputError, Result};
use crate::lookup::Searcher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

/// Longest accepted idea description, in characters.
pub const MAX_IDEA_LENGTH: usize = 10_000;

/// Input to one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub idea_description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

impl AnalysisRequest {
    pub fn new(idea_description: impl Into<String>) -> Self {
        Self {
            idea_description: idea_description.into(),
            keywords: Vec::new(),
            industry: None,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn validate(&self) -> std::result::Result<(), InputError> {
        if self.idea_description.trim().is_empty() {
            return Err(InputError::EmptyField {
                field: "idea_description",
            });
        }
        let len = self.idea_description.chars().count();
        if len > MAX_IDEA_LENGTH {
            return Err(InputError::TooLong {
                field: "idea_description",
                len,
                max: MAX_IDEA_LENGTH,
            });
        }
        Ok(())
    }
}

/// The outcome of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedReport {
    /// One entry per dimension, always all six.
    pub scores: BTreeMap<Dimension, FactorScore>,
    /// Weighted aggregate in `[0, 100]`, one decimal.
    pub weighted_total: f64,
    /// Deduplicated patents, capped at the report limit.
    pub patents: Vec<PatentRecord>,
    /// Dimensions whose score is a fallback rather than a parsed result.
    #[serde(default)]
    pub degraded: Vec<Dimension>,
}

impl WeightedReport {
    pub fn score(&self, dimension: Dimension) -> Option<f64> {
        self.scores.get(&dimension).map(|s| s.score)
    }

    pub fn is_degraded(&self, dimension: Dimension) -> bool {
        self.degraded.contains(&dimension)
    }
}

/// Coordinates factor evaluation, patent discovery and weighting.
pub struct IdeaScorer {
    evaluator: FactorEvaluator,
    discovery: PatentDiscovery,
    weights: WeightingTable,
    lookup: LookupConfig,
    report_limit: usize,
}

impl IdeaScorer {
    /// Build a scorer, validating the configured weights up front.
    pub fn new(
        brain: Brain,
        searcher: Searcher,
        config: &AppConfig,
    ) -> std::result::Result<Self, ConfigError> {
        let weights = config.scoring.weighting_table()?;
        Ok(Self {
            evaluator: FactorEvaluator::new(brain.clone(), config.scoring.factor_max_tokens),
            discovery: PatentDiscovery::new(brain, searcher, &config.scoring),
            weights,
            lookup: config.lookup.clone(),
            report_limit: config.scoring.report_limit,
        })
    }

    pub fn weights(&self) -> &WeightingTable {
        &self.weights
    }

    /// Score an idea.
    ///
    /// Only input validation can fail. Gateway, extraction, and lookup
    /// failures are absorbed per dimension and listed in
    /// [`WeightedReport::degraded`].
    pub async fn score_idea(&self, request: &AnalysisRequest) -> Result<WeightedReport> {
        request.validate()?;

        let run_id = Uuid::new_v4();
        let span = info_span!("score_idea", %run_id);
        Ok(self.run(request).instrument(span).await)
    }

    async fn run(&self, request: &AnalysisRequest) -> WeightedReport {
        info!(
            keywords = request.keywords.len(),
            industry = request.industry.as_deref().unwrap_or("-"),
            "Starting idea analysis"
        );

        // One budget per run, never shared.
        let budget = SearchBudget::from_config(&self.lookup);

        let evaluations = futures::future::join_all(
            Dimension::EVALUATED
                .iter()
                .map(|dimension| self.evaluator.evaluate(*dimension, request)),
        );
        let (evaluations, discovery) =
            tokio::join!(evaluations, self.discovery.discover(request, &budget));

        let mut scores = BTreeMap::new();
        let mut degraded = Vec::new();
        for evaluation in evaluations {
            if !evaluation.is_parsed() {
                degraded.push(evaluation.value().dimension);
            }
            let score = evaluation.into_inner();
            scores.insert(score.dimension, score);
        }

        let risk = discovery.risk();
        if !discovery.terms_parsed {
            degraded.push(Dimension::PatentRisk);
        }
        scores.insert(Dimension::PatentRisk, risk);
        degraded.sort();

        let weighted_total = self
            .weights
            .weighted_total(scores.values().map(|s| (s.dimension, s.score)));

        let mut patents = discovery.patents;
        patents.truncate(self.report_limit);

        if degraded.len() == Dimension::ALL.len() {
            error!("Every scoring stage degraded; report contains only default scores");
        }
        info!(
            weighted_total,
            degraded = degraded.len(),
            patents = patents.len(),
            searches = budget.used(),
            "Idea analysis complete"
        );

        WeightedReport {
            scores,
            weighted_total,
            patents,
            degraded,
        }
    }
}
