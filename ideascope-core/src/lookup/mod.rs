//! Web lookup gateway.
//!
//! `WebLookup` is the seam for the expensive, rate-limited search service.
//! `Searcher` is what pipelines call: it charges the run's `SearchBudget`,
//! waits out the budget's spacing gate, applies a deadline, and turns every
//! failure into "no results" so a lookup problem never aborts a run.

use crate::budget::SearchBudget;
use crate::config::LookupConfig;
use crate::error::LookupError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

pub mod duckduckgo;

pub use duckduckgo::{DuckDuckGoInstantLookup, DuckDuckGoLookup};

/// A single search result. Formatting is untrusted; fields may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
        }
    }
}

/// Trait for web search backends.
#[async_trait]
pub trait WebLookup: Send + Sync {
    /// Return at most `limit` results for `query`, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, LookupError>;
}

/// Create the configured lookup backend.
pub fn create_lookup(config: &LookupConfig) -> Result<Arc<dyn WebLookup>, LookupError> {
    match config.provider.to_ascii_lowercase().as_str() {
        "duckduckgo" | "ddg" => Ok(Arc::new(DuckDuckGoLookup::new(config)?)),
        "duckduckgo_instant" => Ok(Arc::new(DuckDuckGoInstantLookup::new(config)?)),
        other => Err(LookupError::Request {
            message: format!("Unsupported lookup provider: {}", other),
        }),
    }
}

/// Budget-governed front end over a `WebLookup`.
#[derive(Clone)]
pub struct Searcher {
    lookup: Arc<dyn WebLookup>,
    timeout: Duration,
}

impl Searcher {
    pub fn new(lookup: Arc<dyn WebLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// Run one lookup charged to `budget`.
    ///
    /// Returns an empty list when the budget is exhausted (the backend is not
    /// contacted), when the lookup fails, or when it misses its deadline.
    pub async fn search(&self, budget: &SearchBudget, query: &str, limit: usize) -> Vec<SearchHit> {
        let Some(permit) = budget.try_acquire() else {
            info!(
                query,
                max = budget.max(),
                "Web search limit reached, skipping lookup"
            );
            return Vec::new();
        };
        permit.ready().await;

        info!(
            query,
            used = budget.used(),
            remaining = budget.remaining(),
            "Performing web search"
        );

        match tokio::time::timeout(self.timeout, self.lookup.search(query, limit)).await {
            Ok(Ok(hits)) => {
                debug!(query, results = hits.len(), "Web search complete");
                hits
            }
            Ok(Err(e)) => {
                warn!(query, error = %e, "Web search failed, treating as no results");
                Vec::new()
            }
            Err(_) => {
                let e = LookupError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                };
                warn!(query, error = %e, "Web search failed, treating as no results");
                Vec::new()
            }
        }
    }
}

/// A mock lookup backend for tests.
///
/// Returns the hits of the first rule whose needle occurs in the query,
/// otherwise the default hits. Every query is recorded.
pub struct MockWebLookup {
    rules: Vec<(String, Result<Vec<SearchHit>, String>)>,
    default_hits: Result<Vec<SearchHit>, String>,
    queries: Mutex<Vec<String>>,
}

impl MockWebLookup {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_hits: Ok(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every query returns `hits`.
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            default_hits: Ok(hits),
            ..Self::new()
        }
    }

    /// Every query fails.
    pub fn failing(message: &str) -> Self {
        Self {
            default_hits: Err(message.to_string()),
            ..Self::new()
        }
    }

    pub fn on(mut self, needle: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.rules.push((needle.into(), Ok(hits)));
        self
    }

    pub fn fail_on(mut self, needle: impl Into<String>, message: &str) -> Self {
        self.rules.push((needle.into(), Err(message.to_string())));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MockWebLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebLookup for MockWebLookup {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, LookupError> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query.to_string());

        let outcome = self
            .rules
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, outcome)| outcome)
            .unwrap_or(&self.default_hits);

        match outcome {
            Ok(hits) => Ok(hits.iter().take(limit).cloned().collect()),
            Err(message) => Err(LookupError::Request {
                message: message.clone(),
            }),
        }
    }
}
