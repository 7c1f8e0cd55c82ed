//! Integration tests for the scoring and market pipelines.
//!
//! These drive both coordinators end-to-end with MockLlmProvider and
//! MockWebLookup, covering total dependency failure, budget limits and
//! concurrency of the factor evaluators.

use ideascope_core::brain::{Brain, MockLlmProvider, MockReply};
use ideascope_core::config::{AppConfig, StagePolicies};
use ideascope_core::error::{IdeaScopeError, MarketError};
use ideascope_core::idea::{AnalysisRequest, Dimension, IdeaScorer};
use ideascope_core::lookup::{MockWebLookup, SearchHit, Searcher};
use ideascope_core::market::{MarketAnalyzer, MarketRequest, MarketStage};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn scorer(
    llm: Arc<MockLlmProvider>,
    lookup: Arc<MockWebLookup>,
    config: &AppConfig,
) -> IdeaScorer {
    IdeaScorer::new(
        Brain::new(llm, config.llm.timeout()),
        Searcher::new(lookup, config.lookup.timeout()),
        config,
    )
    .unwrap()
}

fn market_request() -> MarketRequest {
    MarketRequest {
        startup_idea: "Marketplace for refurbished lab equipment".into(),
        ideal_customer: "University labs".into(),
        problem_solving: "New equipment is too expensive".into(),
        industry: "Life sciences".into(),
        known_competitors: Some("LabX".into()),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_total_failure_still_produces_full_report() {
    let llm = Arc::new(MockLlmProvider::failing("gateway unreachable"));
    let lookup = Arc::new(MockWebLookup::failing("lookup unreachable"));
    let config = AppConfig::default();

    let request = AnalysisRequest::new("A");
    let report = scorer(llm.clone(), lookup.clone(), &config)
        .score_idea(&request)
        .await
        .unwrap();

    assert_eq!(report.scores.len(), 6);
    for dimension in Dimension::EVALUATED {
        assert_eq!(report.score(dimension), Some(5.0));
    }
    // No patents found: strong patent freedom.
    assert_eq!(report.score(Dimension::PatentRisk), Some(9.0));
    assert_eq!(report.weighted_total, 58.0);
    assert!(report.patents.is_empty());
    assert_eq!(report.degraded.len(), 6);

    // Fallback terms were still looked up.
    assert_eq!(
        lookup.queries(),
        vec!["innovation patent", "technology patent"]
    );
    // Five evaluators plus one term extraction; no retries.
    assert_eq!(llm.call_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_lookups_never_exceed_budget() {
    let llm = Arc::new(
        MockLlmProvider::new()
            .on("search terms", MockReply::text(r#"["a1", "b2", "c3", "d4", "e5"]"#))
            .with_default(MockReply::text(r#"{"score": 7, "explanation": "fine"}"#)),
    );
    let lookup = Arc::new(MockWebLookup::with_hits(vec![SearchHit::new(
        "Same patent",
        "",
        "https://patents.google.com/patent/US9999999B2",
    )]));
    let mut config = AppConfig::default();
    config.scoring.max_patent_terms = 5;
    config.lookup.max_web_searches = 3;

    let report = scorer(llm, lookup.clone(), &config)
        .score_idea(&AnalysisRequest::new("Wearable hydration monitor"))
        .await
        .unwrap();

    assert_eq!(lookup.call_count(), 3);
    // Three lookups returned the same record: deduplicated to one.
    assert_eq!(report.patents.len(), 1);
    assert_eq!(report.score(Dimension::PatentRisk), Some(7.5));
    assert!(report.degraded.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lookups_are_spaced_by_cooldown() {
    let llm = Arc::new(
        MockLlmProvider::new()
            .on("search terms", MockReply::text(r#"["x", "y", "z"]"#))
            .with_default(MockReply::text(r#"{"score": 5, "explanation": "ok"}"#)),
    );
    let lookup = Arc::new(MockWebLookup::new());
    let config = AppConfig::default();

    let start = Instant::now();
    scorer(llm, lookup.clone(), &config)
        .score_idea(&AnalysisRequest::new("Anything at all"))
        .await
        .unwrap();

    assert_eq!(lookup.call_count(), 3);
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_factor_evaluators_run_concurrently() {
    let reply = MockReply::Delayed(
        Duration::from_secs(10),
        r#"{"score": 6, "explanation": "slow but fine"}"#.into(),
    );
    let llm = Arc::new(
        MockLlmProvider::new()
            .on("search terms", MockReply::text("[]"))
            .with_default(reply),
    );
    let mut config = AppConfig::default();
    config.lookup.cooldown_ms = 0;

    let start = Instant::now();
    let report = scorer(llm, Arc::new(MockWebLookup::new()), &config)
        .score_idea(&AnalysisRequest::new("Concurrent evaluation check"))
        .await
        .unwrap();

    // Five sequential calls would take 50s.
    assert!(start.elapsed() < Duration::from_secs(20));
    assert_eq!(report.score(Dimension::Novelty), Some(6.0));
}

#[tokio::test(start_paused = true)]
async fn test_hung_gateway_times_out_to_fallback() {
    let llm = Arc::new(MockLlmProvider::new().with_default(MockReply::Delayed(
        Duration::from_secs(3600),
        "{}".into(),
    )));
    let mut config = AppConfig::default();
    config.llm.timeout_secs = 5;

    let report = scorer(llm, Arc::new(MockWebLookup::new()), &config)
        .score_idea(&AnalysisRequest::new("Hung dependency"))
        .await
        .unwrap();

    assert_eq!(report.weighted_total, 58.0);
    assert_eq!(report.degraded.len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_market_default_policies_propagate_late_failures() {
    let llm = Arc::new(MockLlmProvider::failing("gateway unreachable"));
    let config = AppConfig::default();
    let analyzer = MarketAnalyzer::new(
        Brain::new(llm.clone(), config.llm.timeout()),
        Searcher::new(Arc::new(MockWebLookup::new()), config.lookup.timeout()),
        &config,
    );

    let err = analyzer.analyze_market(&market_request()).await.unwrap_err();
    assert!(matches!(
        err,
        IdeaScopeError::Market(MarketError::StageFailed {
            stage: MarketStage::Competitors,
            ..
        })
    ));
    // Segments and personas isolated their failures before competitors aborted.
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_market_budget_is_per_run() {
    let lookup = Arc::new(MockWebLookup::new());
    let mut config = AppConfig::default();
    config.lookup.max_web_searches = 1;
    config.market.policies = StagePolicies::isolate_all();
    let analyzer = MarketAnalyzer::new(
        Brain::new(
            Arc::new(MockLlmProvider::with_response("[]")),
            config.llm.timeout(),
        ),
        Searcher::new(lookup.clone(), config.lookup.timeout()),
        &config,
    );

    for _ in 0..3 {
        analyzer.analyze_market(&market_request()).await.unwrap();
    }
    // One competitor lookup per run, never refused by an earlier run.
    assert_eq!(lookup.call_count(), 3);
}

#[test]
fn test_reports_serialize_to_json() {
    let json = serde_json::json!({
        "scores": {},
        "weighted_total": 0.0,
        "patents": []
    });
    let report: ideascope_core::WeightedReport = serde_json::from_value(json).unwrap();
    assert!(report.degraded.is_empty());

    let back = serde_json::to_value(&report).unwrap();
    assert!(back.get("weighted_total").is_some());
}
