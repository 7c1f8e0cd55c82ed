//! Market pipeline stages, their failure policies, and their prompts.

use super::types::{CompetitorMap, CustomerSegment, MarketRequest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positioning text used when the positioning stage cannot produce any.
pub const POSITIONING_FALLBACK: &str = "Unable to generate positioning insights.";

/// One stage of the market pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStage {
    Segments,
    Personas,
    Competitors,
    Gaps,
    Positioning,
}

impl MarketStage {
    pub const ALL: [MarketStage; 5] = [
        MarketStage::Segments,
        MarketStage::Personas,
        MarketStage::Competitors,
        MarketStage::Gaps,
        MarketStage::Positioning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MarketStage::Segments => "segments",
            MarketStage::Personas => "personas",
            MarketStage::Competitors => "competitors",
            MarketStage::Gaps => "gaps",
            MarketStage::Positioning => "positioning",
        }
    }
}

impl fmt::Display for MarketStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage does when the completion gateway fails.
///
/// Only gateway failures are subject to the policy. Unparseable responses
/// and failed or refused lookups always degrade to the stage default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Substitute the stage default and continue.
    Isolate,
    /// Abort the run with `MarketError::StageFailed`.
    Propagate,
}

fn or_unspecified(value: Option<&str>) -> &str {
    value.unwrap_or("Not specified")
}

pub fn segments_prompt(request: &MarketRequest) -> String {
    format!(
        r#"You are a market segmentation expert. Analyze the startup and identify 2-3 distinct customer segments.

Startup: {idea}
Ideal Customer: {customer}
Problem: {problem}
Industry: {industry}

For each segment:
1. Name (3-5 words)
2. Brief description (1 sentence)
3. Market size: Small/Medium/Large
4. 3 key characteristics

Return ONLY valid JSON:
[
  {{
    "name": "Segment Name",
    "description": "One sentence description",
    "size": "Small/Medium/Large",
    "key_characteristics": ["char 1", "char 2", "char 3"]
  }}
]

Be concise and specific."#,
        idea = request.startup_idea,
        customer = request.ideal_customer,
        problem = request.problem_solving,
        industry = request.industry,
    )
}

pub fn personas_prompt(request: &MarketRequest, segments: &[CustomerSegment]) -> String {
    let segment_line = if segments.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = segments.iter().map(|s| s.name.as_str()).collect();
        format!("Segments: {}\n", names.join(", "))
    };
    format!(
        r#"Create 2-3 customer personas for this startup.

Startup: {idea}
Ideal Customer: {customer}
Problem: {problem}
{segment_line}
For each persona:
1. Name (e.g., "Tech-Savvy Sarah")
2. Demographics (1 sentence: age, job, location)
3. Psychographics (1 sentence: values, motivations)
4. 3 pain points
5. 3 goals

Return ONLY valid JSON:
[
  {{
    "name": "Persona Name",
    "demographics": "One sentence",
    "psychographics": "One sentence",
    "pain_points": ["point 1", "point 2", "point 3"],
    "goals": ["goal 1", "goal 2", "goal 3"]
  }}
]

Be concise and realistic."#,
        idea = request.startup_idea,
        customer = request.ideal_customer,
        problem = request.problem_solving,
    )
}

/// Web query for the competitor stage: `<industry> companies <regions> competitors`.
pub fn competitor_query(request: &MarketRequest) -> String {
    let mut parts = vec![request.industry.trim(), "companies"];
    if let Some(regions) = MarketRequest::optional(&request.geographic_regions) {
        parts.push(regions);
    }
    parts.push("competitors");
    parts.join(" ")
}

pub fn competitors_prompt(request: &MarketRequest, result_titles: &[String]) -> String {
    let web_results = if result_titles.is_empty() {
        "None".to_string()
    } else {
        result_titles
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"Map competitors for this startup.

Startup: {idea}
Industry: {industry}
Known Competitors: {known}

Web Results:
{web_results}

Identify:
1. Direct (2-3): Similar solutions, same market
2. Adjacent (2-3): Related spaces
3. Indirect (2-3): Alternative solutions

Return ONLY valid JSON:
{{
  "direct": [
    {{
      "name": "Company",
      "description": "Brief 1 sentence",
      "strengths": ["str 1", "str 2", "str 3"],
      "weaknesses": ["weak 1", "weak 2", "weak 3"]
    }}
  ],
  "adjacent": [
    {{
      "name": "Company",
      "description": "Brief",
      "relevance": "Short relevance"
    }}
  ],
  "indirect": [
    {{
      "name": "Solution",
      "description": "Brief",
      "relevance": "Short relevance"
    }}
  ]
}}

Be concise. Use real companies from web results."#,
        idea = request.startup_idea,
        industry = request.industry,
        known = MarketRequest::optional(&request.known_competitors).unwrap_or("None"),
    )
}

pub fn gaps_prompt(request: &MarketRequest, competitors: &CompetitorMap) -> String {
    format!(
        r#"Identify 3-4 market opportunities for this startup.

Startup: {idea}
Problem: {problem}
Unique Value: {unique}

Competitors: {direct} direct found

Return ONLY valid JSON array:
["Opportunity 1 (1 sentence)", "Opportunity 2", "Opportunity 3"]

Be specific and actionable."#,
        idea = request.startup_idea,
        problem = request.problem_solving,
        unique = or_unspecified(MarketRequest::optional(&request.unique_value)),
        direct = competitors.direct.len(),
    )
}

pub fn positioning_prompt(
    request: &MarketRequest,
    segment_count: usize,
    competitors: &CompetitorMap,
) -> String {
    format!(
        r#"Provide concise positioning strategy for this startup.

Startup: {idea}
Unique Value: {unique}
Model: {model}

Segments: {segment_count}
Direct Competitors: {direct}

Cover:
1. Positioning strategy (2 sentences)
2. Key differentiation (2 sentences)
3. Go-to-market approach (2 sentences)

Be specific and actionable. Max 150 words total."#,
        idea = request.startup_idea,
        unique = or_unspecified(MarketRequest::optional(&request.unique_value)),
        model = or_unspecified(MarketRequest::optional(&request.business_model)),
        direct = competitors.direct.len(),
    )
}
