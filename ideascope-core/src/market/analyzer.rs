//! Market intelligence coordinator.
//!
//! Runs the five stages strictly in order, threading each stage's output
//! into later prompts. A gateway failure in a stage is handled by that
//! stage's [`FailurePolicy`]; everything else degrades to the stage default.

use super::stages::{self, FailurePolicy, MarketStage, POSITIONING_FALLBACK};
use super::types::{CompetitorMap, CustomerPersona, CustomerSegment, MarketReport, MarketRequest};
use crate::brain::Brain;
use crate::budget::SearchBudget;
use crate::config::{AppConfig, LookupConfig, MarketConfig};
use crate::error::{MarketError, Result};
use crate::extract::{Extraction, JsonShape, extract_items, extract_or};
use crate::lookup::Searcher;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Coordinates the segments → personas → competitors → gaps → positioning pipeline.
pub struct MarketAnalyzer {
    brain: Brain,
    searcher: Searcher,
    config: MarketConfig,
    lookup: LookupConfig,
}

/// Tracks which stages fell back during one run.
#[derive(Default)]
struct StageLog {
    degraded: Vec<MarketStage>,
}

impl StageLog {
    fn record<T>(&mut self, stage: MarketStage, result: Extraction<T>) -> T {
        if !result.is_parsed() {
            self.degraded.push(stage);
        }
        result.into_inner()
    }
}

impl MarketAnalyzer {
    pub fn new(brain: Brain, searcher: Searcher, config: &AppConfig) -> Self {
        Self {
            brain,
            searcher,
            config: config.market.clone(),
            lookup: config.lookup.clone(),
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// Fails on invalid input, or when a stage whose policy is
    /// [`FailurePolicy::Propagate`] hits a gateway error.
    pub async fn analyze_market(&self, request: &MarketRequest) -> Result<MarketReport> {
        request.validate()?;

        let run_id = Uuid::new_v4();
        let span = info_span!("analyze_market", %run_id);
        Ok(self.run(request).instrument(span).await?)
    }

    async fn run(&self, request: &MarketRequest) -> std::result::Result<MarketReport, MarketError> {
        info!(industry = request.industry.as_str(), "Starting market analysis");

        // Fresh budget: the search count starts at zero for every run.
        let budget = SearchBudget::from_config(&self.lookup);
        let mut log = StageLog::default();

        let segments = self.segments(request, &mut log).await?;
        let personas = self.personas(request, &segments, &mut log).await?;
        let competitors = self.competitors(request, &budget, &mut log).await?;
        let market_gaps = self.gaps(request, &competitors, &mut log).await?;
        let positioning = self
            .positioning(request, segments.len(), &competitors, &mut log)
            .await?;

        info!(
            searches = budget.used(),
            max_searches = budget.max(),
            degraded = log.degraded.len(),
            "Market analysis complete"
        );

        Ok(MarketReport {
            segments,
            personas,
            competitors,
            market_gaps,
            positioning,
            degraded: log.degraded,
        })
    }

    /// Send one stage prompt, applying the stage's failure policy.
    ///
    /// `Ok(None)` means the failure was isolated and the stage should use
    /// its default.
    async fn ask(
        &self,
        stage: MarketStage,
        prompt: &str,
    ) -> std::result::Result<Option<String>, MarketError> {
        info!(%stage, "Running market stage");
        match self.brain.ask(prompt, self.config.max_tokens(stage)).await {
            Ok(text) => Ok(Some(text)),
            Err(source) => match self.config.policies.for_stage(stage) {
                FailurePolicy::Isolate => {
                    warn!(%stage, error = %source, "Market stage failed, using default");
                    Ok(None)
                }
                FailurePolicy::Propagate => {
                    warn!(%stage, error = %source, "Market stage failed, aborting run");
                    Err(MarketError::StageFailed { stage, source })
                }
            },
        }
    }

    async fn segments(
        &self,
        request: &MarketRequest,
        log: &mut StageLog,
    ) -> std::result::Result<Vec<CustomerSegment>, MarketError> {
        let stage = MarketStage::Segments;
        let result = match self.ask(stage, &stages::segments_prompt(request)).await? {
            Some(text) => extract_items(&text, Vec::new()),
            None => Extraction::Fallback(Vec::new()),
        };
        Ok(log.record(stage, result))
    }

    async fn personas(
        &self,
        request: &MarketRequest,
        segments: &[CustomerSegment],
        log: &mut StageLog,
    ) -> std::result::Result<Vec<CustomerPersona>, MarketError> {
        let stage = MarketStage::Personas;
        let prompt = stages::personas_prompt(request, segments);
        let result = match self.ask(stage, &prompt).await? {
            Some(text) => extract_items(&text, Vec::new()),
            None => Extraction::Fallback(Vec::new()),
        };
        Ok(log.record(stage, result))
    }

    async fn competitors(
        &self,
        request: &MarketRequest,
        budget: &SearchBudget,
        log: &mut StageLog,
    ) -> std::result::Result<CompetitorMap, MarketError> {
        let stage = MarketStage::Competitors;
        let query = stages::competitor_query(request);
        let hits = self
            .searcher
            .search(budget, &query, self.config.competitor_results)
            .await;
        let titles: Vec<String> = hits
            .into_iter()
            .take(self.config.competitor_context)
            .map(|hit| hit.title)
            .collect();

        let prompt = stages::competitors_prompt(request, &titles);
        let result = match self.ask(stage, &prompt).await? {
            Some(text) => extract_or(&text, JsonShape::Object, CompetitorMap::default()),
            None => Extraction::Fallback(CompetitorMap::default()),
        };
        Ok(log.record(stage, result))
    }

    async fn gaps(
        &self,
        request: &MarketRequest,
        competitors: &CompetitorMap,
        log: &mut StageLog,
    ) -> std::result::Result<Vec<String>, MarketError> {
        let stage = MarketStage::Gaps;
        let prompt = stages::gaps_prompt(request, competitors);
        let result = match self.ask(stage, &prompt).await? {
            Some(text) => extract_items(&text, Vec::new()),
            None => Extraction::Fallback(Vec::new()),
        };
        Ok(log.record(stage, result))
    }

    async fn positioning(
        &self,
        request: &MarketRequest,
        segment_count: usize,
        competitors: &CompetitorMap,
        log: &mut StageLog,
    ) -> std::result::Result<String, MarketError> {
        let stage = MarketStage::Positioning;
        let prompt = stages::positioning_prompt(request, segment_count, competitors);
        let result = match self.ask(stage, &prompt).await? {
            Some(text) if !text.trim().is_empty() => Extraction::Parsed(text.trim().to_string()),
            _ => Extraction::Fallback(POSITIONING_FALLBACK.to_string()),
        };
        Ok(log.record(stage, result))
    }
}
