//! DuckDuckGo search backends (no API key required).
//!
//! `DuckDuckGoLookup` reads the HTML results page and returns organic
//! results. `DuckDuckGoInstantLookup` uses the instant answer API, which only
//! answers entity-style queries and is mostly empty for phrases like
//! "<term> patent".

use super::{SearchHit, WebLookup};
use crate::config::LookupConfig;
use crate::error::LookupError;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

const RESULTS_BASE_URL: &str = "https://html.duckduckgo.com/html/";
const INSTANT_BASE_URL: &str = "https://api.duckduckgo.com/";

static RESULT_LINK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a\s([^>]*\bclass="[^"]*\bresult__a\b[^"]*"[^>]*)>(.*?)</a>"#).ok()
});

static RESULT_SNIPPET: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<(?:a|div|td)\s[^>]*\bclass="[^"]*\bresult__snippet\b[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#,
    )
    .ok()
});

static HREF: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#"\bhref="([^"]*)""#).ok());

static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

fn http_client(config: &LookupConfig) -> Result<reqwest::Client, LookupError> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| LookupError::Request {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, LookupError> {
    client
        .get(url)
        .send()
        .await
        .map_err(|e| LookupError::Request {
            message: format!("Search request failed: {}", e),
        })?
        .error_for_status()
        .map_err(|e| LookupError::Request {
            message: format!("Search request rejected: {}", e),
        })
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Strip markup from a fragment and collapse whitespace.
fn fragment_text(fragment: &str) -> String {
    let stripped = match TAG.as_ref() {
        Some(tag) => tag.replace_all(fragment, " "),
        None => fragment.into(),
    };
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Result links go through a `/l/?uddg=<target>` redirect; unwrap it.
fn result_url(href: &str) -> String {
    let href = decode_entities(href);
    if let Some((_, rest)) = href.split_once("uddg=") {
        let target = rest.split('&').next().unwrap_or(rest);
        if let Ok(decoded) = urlencoding::decode(target) {
            return decoded.into_owned();
        }
    }
    match href.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => href,
    }
}

fn is_sponsored(url: &str) -> bool {
    url.contains("duckduckgo.com/y.js") || url.contains("ad_provider=")
}

struct ResultLink {
    start: usize,
    end: usize,
    url: String,
    title: String,
}

/// Extract organic results from a results page, pairing each link with the
/// first snippet that follows it before the next link.
fn parse_results_page(html: &str, limit: usize) -> Vec<SearchHit> {
    let (Some(link_re), Some(snippet_re), Some(href_re)) =
        (RESULT_LINK.as_ref(), RESULT_SNIPPET.as_ref(), HREF.as_ref())
    else {
        return Vec::new();
    };

    let links: Vec<ResultLink> = link_re
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let href = href_re.captures(caps.get(1)?.as_str())?.get(1)?.as_str();
            Some(ResultLink {
                start: whole.start(),
                end: whole.end(),
                url: result_url(href),
                title: fragment_text(caps.get(2)?.as_str()),
            })
        })
        .collect();

    let snippets: Vec<(usize, String)> = snippet_re
        .captures_iter(html)
        .filter_map(|caps| Some((caps.get(0)?.start(), fragment_text(caps.get(1)?.as_str()))))
        .collect();

    let mut hits = Vec::new();
    for (i, link) in links.iter().enumerate() {
        if hits.len() >= limit {
            break;
        }
        if link.title.is_empty() || is_sponsored(&link.url) {
            continue;
        }
        let next = links.get(i + 1).map_or(html.len(), |n| n.start);
        let snippet = snippets
            .iter()
            .find(|(pos, _)| *pos >= link.end && *pos < next)
            .map(|(_, text)| text.clone())
            .unwrap_or_default();
        hits.push(SearchHit::new(&link.title, snippet, &link.url));
    }
    hits
}

/// Searches DuckDuckGo's HTML results page.
pub struct DuckDuckGoLookup {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoLookup {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| RESULTS_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl WebLookup for DuckDuckGoLookup {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, LookupError> {
        let url = format!("{}?q={}", self.base_url, urlencoding::encode(query));
        let html = fetch(&self.client, &url)
            .await?
            .text()
            .await
            .map_err(|e| LookupError::ResponseParse {
                message: format!("Failed to read results page: {}", e),
            })?;

        let hits = parse_results_page(&html, limit);
        if hits.is_empty() {
            debug!(query, bytes = html.len(), "Results page contained no organic results");
        }
        Ok(hits)
    }
}

/// Searches DuckDuckGo's instant answer API.
pub struct DuckDuckGoInstantLookup {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoInstantLookup {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        Ok(Self {
            client: http_client(config)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| INSTANT_BASE_URL.to_string()),
        })
    }

    /// Flatten an instant-answer payload into hits.
    ///
    /// The abstract (if any) comes first, then related topics (including
    /// topics nested inside category groups), then direct results.
    fn parse_instant_answer(body: &serde_json::Value, limit: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();

        if let Some(abstract_text) = body.get("AbstractText").and_then(|v| v.as_str())
            && !abstract_text.is_empty()
        {
            let heading = body
                .get("Heading")
                .and_then(|v| v.as_str())
                .filter(|h| !h.is_empty())
                .or_else(|| body.get("AbstractSource").and_then(|v| v.as_str()))
                .unwrap_or("Unknown");
            let url = body
                .get("AbstractURL")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            hits.push(SearchHit::new(heading, abstract_text, url));
        }

        let mut topics: Vec<&serde_json::Value> = Vec::new();
        if let Some(related) = body.get("RelatedTopics").and_then(|v| v.as_array()) {
            for topic in related {
                match topic.get("Topics").and_then(|v| v.as_array()) {
                    Some(group) => topics.extend(group.iter()),
                    None => topics.push(topic),
                }
            }
        }
        if let Some(results) = body.get("Results").and_then(|v| v.as_array()) {
            topics.extend(results.iter());
        }

        for topic in topics {
            if hits.len() >= limit {
                break;
            }
            let Some(text) = topic.get("Text").and_then(|v| v.as_str()) else {
                continue;
            };
            let url = topic.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
            let title = text.split(" - ").next().unwrap_or(text).trim();
            hits.push(SearchHit::new(title, text, url));
        }

        hits.truncate(limit);
        hits
    }
}

#[async_trait]
impl WebLookup for DuckDuckGoInstantLookup {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, LookupError> {
        let url = format!(
            "{}?q={}&format=json&no_html=1&skip_disambig=1",
            self.base_url,
            urlencoding::encode(query)
        );

        let body: serde_json::Value =
            fetch(&self.client, &url)
                .await?
                .json()
                .await
                .map_err(|e| LookupError::ResponseParse {
                    message: format!("Failed to parse search response: {}", e),
                })?;

        Ok(Self::parse_instant_answer(&body, limit))
    }
}
