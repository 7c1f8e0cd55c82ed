//! Patent discovery and count-based patent risk.
//!
//! Discovery asks the model for patent-style search terms, looks up the first
//! few of them under the run's [`SearchBudget`], and deduplicates the hits by
//! publication number. Risk is a pure function of how many records survive.

use super::dimension::{Dimension, FactorScore};
use super::scorer::AnalysisRequest;
use crate::brain::Brain;
use crate::budget::SearchBudget;
use crate::config::ScoringConfig;
use crate::extract::{Extraction, extract_items};
use crate::lookup::{SearchHit, Searcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Terms used when extraction fails and the caller supplied no keywords.
pub const DEFAULT_SEARCH_TERMS: [&str; 2] = ["innovation", "technology"];

const UNKNOWN: &str = "Unknown";

/// Publication numbers such as `US10123456B2`, `EP 3456789 A1` or `WO2020123456A1`.
static PUBLICATION_NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(US|EP|WO|CN|JP|KR|DE|GB|FR|CA|AU)[- ]?(\d{5,12})[- ]?([A-C]\d?)?\b").ok()
});

/// A patent found during discovery. Unique by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatentRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub filing_date: String,
    pub status: String,
    pub link: String,
}

impl PatentRecord {
    /// Map a web hit to a record keyed by its publication number, or by the
    /// URL when no number is present.
    pub fn from_hit(hit: &SearchHit) -> Self {
        let id = publication_number(&hit.url)
            .or_else(|| publication_number(&hit.title))
            .unwrap_or_else(|| hit.url.clone());
        Self {
            id,
            title: hit.title.clone(),
            summary: hit.snippet.clone(),
            filing_date: UNKNOWN.to_string(),
            status: UNKNOWN.to_string(),
            link: hit.url.clone(),
        }
    }
}

/// Find a publication number in `text`, normalized without separators.
pub fn publication_number(text: &str) -> Option<String> {
    let re = PUBLICATION_NUMBER.as_ref()?;
    let caps = re.captures(text)?;
    let mut id = format!("{}{}", &caps[1], &caps[2]);
    if let Some(kind) = caps.get(3) {
        id.push_str(kind.as_str());
    }
    Some(id)
}

/// Keep the first record for each `id`, in input order, up to `limit` records.
pub fn dedup_patents<I>(records: I, limit: usize) -> Vec<PatentRecord>
where
    I: IntoIterator<Item = PatentRecord>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .take(limit)
        .collect()
}

/// Map a patent count to a risk score. Higher means more patent freedom.
pub fn assess_patent_risk(count: usize) -> FactorScore {
    let (score, explanation) = match count {
        0 => (
            9.0,
            "No closely related patents found, suggesting strong patent freedom.".to_string(),
        ),
        1..=4 => (
            7.5,
            format!(
                "Found {count} related patents. Relatively clear patent landscape with manageable risks."
            ),
        ),
        5..=9 => (
            6.0,
            format!(
                "Found {count} related patents. Moderate patent risk; differentiation strategy needed."
            ),
        ),
        _ => (
            4.0,
            format!(
                "Found {count} related patents, indicating a crowded patent landscape. Careful freedom-to-operate analysis recommended."
            ),
        ),
    };
    FactorScore::new(Dimension::PatentRisk, score, explanation)
}

/// Terms to search when the model cannot supply any.
pub fn fallback_search_terms(keywords: &[String]) -> Vec<String> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        DEFAULT_SEARCH_TERMS.iter().map(|t| t.to_string()).collect()
    } else {
        keywords
    }
}

fn search_terms_prompt(request: &AnalysisRequest) -> String {
    let mut prompt = format!(
        "Extract 3-5 specific technical search terms for finding relevant patents for this idea:\n\n\
         **Idea Description:**\n{}\n\n",
        request.idea_description
    );
    if !request.keywords.is_empty() {
        let _ = writeln!(prompt, "**Keywords:** {}\n", request.keywords.join(", "));
    }
    prompt.push_str(
        "**Instructions:**\n\
         - Focus on technical, specific terminology\n\
         - Use patent-friendly language\n\
         - Include core technology components\n\
         - Avoid generic business terms\n\n\
         **Output Format:**\n\
         Provide ONLY a JSON array of strings:\n\
         [\"term1\", \"term2\", \"term3\"]",
    );
    prompt
}

/// Result of one discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    /// Deduplicated records, capped at the discovery limit.
    pub patents: Vec<PatentRecord>,
    /// Whether the search terms came from the model rather than the fallback.
    pub terms_parsed: bool,
}

impl Discovery {
    pub fn risk(&self) -> FactorScore {
        assess_patent_risk(self.patents.len())
    }
}

/// Patent discovery over the completion and lookup gateways.
#[derive(Clone)]
pub struct PatentDiscovery {
    brain: Brain,
    searcher: Searcher,
    terms_max_tokens: usize,
    max_terms: usize,
    results_per_term: usize,
    discovery_limit: usize,
}

impl PatentDiscovery {
    pub fn new(brain: Brain, searcher: Searcher, config: &ScoringConfig) -> Self {
        Self {
            brain,
            searcher,
            terms_max_tokens: config.terms_max_tokens,
            max_terms: config.max_patent_terms,
            results_per_term: config.results_per_term,
            discovery_limit: config.discovery_limit,
        }
    }

    /// Ask the model for patent search terms, falling back to the request's
    /// keywords or [`DEFAULT_SEARCH_TERMS`].
    pub async fn extract_search_terms(&self, request: &AnalysisRequest) -> Extraction<Vec<String>> {
        let fallback = || fallback_search_terms(&request.keywords);

        let text = match self
            .brain
            .ask(&search_terms_prompt(request), self.terms_max_tokens)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Search term extraction failed, using fallback terms");
                return Extraction::Fallback(fallback());
            }
        };

        let terms = extract_items::<String>(&text, Vec::new()).map(|terms| {
            terms
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        });

        match terms {
            Extraction::Parsed(terms) if !terms.is_empty() => Extraction::Parsed(terms),
            _ => {
                warn!("Could not extract search terms from response, using fallback terms");
                Extraction::Fallback(fallback())
            }
        }
    }

    /// Run discovery: terms, budgeted lookups, deduplication.
    ///
    /// A failed or refused lookup counts as zero results for that term and
    /// does not stop the remaining terms.
    pub async fn discover(&self, request: &AnalysisRequest, budget: &SearchBudget) -> Discovery {
        let terms = self.extract_search_terms(request).await;
        let terms_parsed = terms.is_parsed();
        let terms = terms.into_inner();

        let mut found = Vec::new();
        for term in terms.iter().take(self.max_terms) {
            let query = format!("{term} patent");
            let hits = self
                .searcher
                .search(budget, &query, self.results_per_term)
                .await;
            debug!(term = term.as_str(), results = hits.len(), "Patent lookup complete");
            found.extend(hits.iter().map(PatentRecord::from_hit));
        }

        let raw = found.len();
        let patents = dedup_patents(found, self.discovery_limit);
        info!(
            terms = terms.len().min(self.max_terms),
            raw,
            unique = patents.len(),
            "Patent discovery complete"
        );

        Discovery {
            patents,
            terms_parsed,
        }
    }
}
