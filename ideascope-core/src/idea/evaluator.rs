//! Factor evaluation: one completion request per scoring dimension.

use super::dimension::{Dimension, FactorScore, NEUTRAL_SCORE};
use super::scorer::AnalysisRequest;
use crate::brain::Brain;
use crate::extract::{Extraction, JsonShape, extract_json};
use serde_json::Value;
use std::fmt::Write as _;
use tracing::{debug, warn};

const MISSING_EXPLANATION: &str = "Analysis unavailable";

/// Prompt template for one evaluated dimension.
struct Rubric {
    task: &'static str,
    criteria: &'static [&'static str],
    /// Meaning of a 10, a 5, and a 0.
    anchors: [&'static str; 3],
    with_keywords: bool,
    with_industry: bool,
    closing: Option<&'static str>,
}

fn rubric(dimension: Dimension) -> Option<Rubric> {
    let rubric = match dimension {
        Dimension::Novelty => Rubric {
            task: "Analyze the novelty and originality of this startup idea",
            criteria: &[
                "How unique is this solution compared to existing approaches?",
                "Does it introduce new technology, methodology, or business model?",
                "Is there a genuinely novel insight or innovation?",
                "How differentiated is this from current market offerings?",
            ],
            anchors: [
                "Groundbreaking innovation",
                "Moderate novelty",
                "Completely derivative",
            ],
            with_keywords: true,
            with_industry: true,
            closing: Some("Be critical but fair."),
        },
        Dimension::TechnicalFeasibility => Rubric {
            task: "Evaluate the technical feasibility of this startup idea",
            criteria: &[
                "Is the required technology currently available or achievable?",
                "What are the technical challenges and risks?",
                "Are there proven technical precedents or is this speculative?",
                "What is the technical complexity level?",
                "Can this be built with current engineering practices?",
            ],
            anchors: [
                "Highly feasible with current technology",
                "Challenging but possible",
                "Technically infeasible",
            ],
            with_keywords: false,
            with_industry: false,
            closing: None,
        },
        Dimension::MarketOverlap => Rubric {
            task: "Analyze the market overlap and competitive landscape for this startup idea",
            criteria: &[
                "How crowded is this market space?",
                "Are there many similar existing solutions?",
                "What is the competitive differentiation?",
                "Is there a clear blue ocean or is it a red ocean market?",
            ],
            anchors: [
                "Unique market position, minimal overlap with existing solutions",
                "Moderate competition, some differentiation possible",
                "Heavily saturated market, indistinguishable from competitors",
            ],
            with_keywords: true,
            with_industry: true,
            closing: None,
        },
        Dimension::ImplementationComplexity => Rubric {
            task: "Evaluate the MVP implementation complexity for this startup idea",
            criteria: &[
                "How quickly can a minimum viable product be built?",
                "What technical resources are required?",
                "Dependencies on third-party systems or data?",
                "Infrastructure and operational complexity?",
            ],
            anchors: [
                "Simple MVP achievable in weeks with small team",
                "Moderate complexity, requires months and specialized skills",
                "Extremely complex, requires years and large team",
            ],
            with_keywords: false,
            with_industry: false,
            closing: None,
        },
        Dimension::EthicalRegulatory => Rubric {
            task: "Evaluate ethical and regulatory concerns for this startup idea",
            criteria: &[
                "Privacy and data protection concerns",
                "Regulatory compliance requirements (FDA, FCC, etc.)",
                "Ethical implications of the technology",
                "Potential societal impact and controversies",
            ],
            anchors: [
                "Minimal ethical/regulatory concerns",
                "Moderate concerns requiring compliance effort",
                "Severe ethical issues or heavy regulatory barriers",
            ],
            with_keywords: false,
            with_industry: true,
            closing: None,
        },
        Dimension::PatentRisk => return None,
    };
    Some(rubric)
}

/// Render the evaluation prompt for `dimension`.
///
/// Returns `None` for dimensions that are not scored by a model.
pub fn build_prompt(dimension: Dimension, request: &AnalysisRequest) -> Option<String> {
    let rubric = rubric(dimension)?;
    let mut prompt = String::new();

    let _ = writeln!(prompt, "{} on a scale of 0-10:\n", rubric.task);
    let _ = writeln!(prompt, "**Idea Description:**\n{}\n", request.idea_description);

    if rubric.with_keywords && !request.keywords.is_empty() {
        let _ = writeln!(prompt, "**Keywords:** {}", request.keywords.join(", "));
    }
    if rubric.with_industry
        && let Some(industry) = &request.industry
    {
        let _ = writeln!(prompt, "**Industry:** {industry}");
    }

    prompt.push_str("\n**Evaluation Criteria:**\n");
    for criterion in rubric.criteria {
        let _ = writeln!(prompt, "- {criterion}");
    }

    let [high, mid, low] = rubric.anchors;
    let _ = writeln!(
        prompt,
        "\n**Scoring:**\n- 10 = {high}\n- 5 = {mid}\n- 0 = {low}"
    );

    prompt.push_str(
        "\n**Output Format:**\n\
         Provide ONLY a JSON object with this exact format:\n\
         {\"score\": <number between 0-10>, \"explanation\": \"<2-3 sentence explanation>\"}",
    );

    if let Some(closing) = rubric.closing {
        let _ = write!(prompt, "\n\n{closing}");
    }

    Some(prompt)
}

/// Interpret a parsed object as a score for `dimension`.
///
/// A missing `score` is neutral and a missing `explanation` gets a stock
/// text; a `score` that is present but not numeric rejects the object.
fn score_from_object(dimension: Dimension, object: &Value) -> Option<FactorScore> {
    let score = match object.get("score") {
        None | Some(Value::Null) => NEUTRAL_SCORE,
        Some(Value::Number(n)) => n.as_f64()?,
        Some(Value::String(s)) => s.trim().parse::<f64>().ok()?,
        Some(_) => return None,
    };
    let explanation = object
        .get("explanation")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(MISSING_EXPLANATION);

    Some(FactorScore::new(dimension, score, explanation))
}

/// Parse a model response into a score, falling back to neutral.
pub fn parse_factor_response(dimension: Dimension, text: &str) -> Extraction<FactorScore> {
    match extract_json(text, JsonShape::Object)
        .as_ref()
        .and_then(|object| score_from_object(dimension, object))
    {
        Some(score) => Extraction::Parsed(score),
        None => Extraction::Fallback(FactorScore::fallback(dimension)),
    }
}

/// Scores single dimensions through the completion gateway.
///
/// Failures never escape: a gateway error (including a missed deadline) or an
/// unusable response yields the neutral fallback, reported as
/// [`Extraction::Fallback`].
#[derive(Clone)]
pub struct FactorEvaluator {
    brain: Brain,
    max_tokens: usize,
}

impl FactorEvaluator {
    pub fn new(brain: Brain, max_tokens: usize) -> Self {
        Self { brain, max_tokens }
    }

    pub async fn evaluate(
        &self,
        dimension: Dimension,
        request: &AnalysisRequest,
    ) -> Extraction<FactorScore> {
        let Some(prompt) = build_prompt(dimension, request) else {
            debug!(%dimension, "Dimension is not model-evaluated");
            return Extraction::Fallback(FactorScore::fallback(dimension));
        };

        let text = match self.brain.ask(&prompt, self.max_tokens).await {
            Ok(text) => text,
            Err(e) => {
                warn!(%dimension, error = %e, "Factor evaluation failed, using neutral score");
                return Extraction::Fallback(FactorScore::fallback(dimension));
            }
        };

        let result = parse_factor_response(dimension, &text);
        match &result {
            Extraction::Parsed(score) => debug!(%dimension, score = score.score, "Factor evaluated"),
            Extraction::Fallback(_) => {
                warn!(%dimension, "Could not extract a score from response, using neutral score")
            }
        }
        result
    }
}
