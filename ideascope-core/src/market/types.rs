//! Market intelligence request and report types.
//!
//! Everything a stage parses out of a model response is deserialized
//! leniently: missing fields default, unknown fields are ignored, and
//! string lists are capped at [`MAX_LIST_ITEMS`].

use super::stages::MarketStage;
use crate::error::InputError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Cap on characteristics, pain points, goals, strengths and weaknesses.
pub const MAX_LIST_ITEMS: usize = 3;

/// Longest accepted free-text field, in characters.
pub const MAX_FIELD_LENGTH: usize = 10_000;

fn capped_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut items = Vec::<String>::deserialize(deserializer)?;
    items.truncate(MAX_LIST_ITEMS);
    Ok(items)
}

/// Input to one market intelligence run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketRequest {
    pub startup_idea: String,
    pub ideal_customer: String,
    pub problem_solving: String,
    pub industry: String,
    #[serde(default)]
    pub known_competitors: Option<String>,
    #[serde(default)]
    pub unique_value: Option<String>,
    #[serde(default)]
    pub business_model: Option<String>,
    #[serde(default)]
    pub geographic_regions: Option<String>,
}

impl MarketRequest {
    pub fn validate(&self) -> Result<(), InputError> {
        let required = [
            ("startup_idea", &self.startup_idea),
            ("ideal_customer", &self.ideal_customer),
            ("problem_solving", &self.problem_solving),
            ("industry", &self.industry),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(InputError::EmptyField { field });
            }
            let len = value.chars().count();
            if len > MAX_FIELD_LENGTH {
                return Err(InputError::TooLong {
                    field,
                    len,
                    max: MAX_FIELD_LENGTH,
                });
            }
        }
        Ok(())
    }

    /// An optional field, or `None` when absent or blank.
    pub(crate) fn optional(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Relative size of a customer segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SegmentSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl SegmentSize {
    /// Interpret a free-form size label. Unrecognized labels are `Medium`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        if label.starts_with("large") || label == "l" {
            SegmentSize::Large
        } else if label.starts_with("small") || label == "s" {
            SegmentSize::Small
        } else {
            SegmentSize::Medium
        }
    }
}

impl<'de> Deserialize<'de> for SegmentSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(SegmentSize::from_label(&label))
    }
}

impl fmt::Display for SegmentSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SegmentSize::Small => "Small",
            SegmentSize::Medium => "Medium",
            SegmentSize::Large => "Large",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: SegmentSize,
    #[serde(default, deserialize_with = "capped_list")]
    pub key_characteristics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPersona {
    pub name: String,
    #[serde(default)]
    pub demographics: String,
    #[serde(default)]
    pub psychographics: String,
    #[serde(default, deserialize_with = "capped_list")]
    pub pain_points: Vec<String>,
    #[serde(default, deserialize_with = "capped_list")]
    pub goals: Vec<String>,
}

/// A competitor in the same market with a similar solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectCompetitor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "capped_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "capped_list")]
    pub weaknesses: Vec<String>,
}

/// An adjacent or indirect competitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedCompetitor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub relevance: String,
}

/// Competitors partitioned into direct, adjacent and indirect tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorMap {
    #[serde(default)]
    pub direct: Vec<DirectCompetitor>,
    #[serde(default)]
    pub adjacent: Vec<RelatedCompetitor>,
    #[serde(default)]
    pub indirect: Vec<RelatedCompetitor>,
}

impl CompetitorMap {
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.adjacent.is_empty() && self.indirect.is_empty()
    }
}

/// The outcome of one market intelligence run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub segments: Vec<CustomerSegment>,
    pub personas: Vec<CustomerPersona>,
    pub competitors: CompetitorMap,
    pub market_gaps: Vec<String>,
    pub positioning: String,
    /// Stages whose output is a default rather than a parsed result.
    #[serde(default)]
    pub degraded: Vec<MarketStage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request() -> MarketRequest {
        MarketRequest {
            startup_idea: "Subscription meal kits for shift workers".into(),
            ideal_customer: "Nurses on night shifts".into(),
            problem_solving: "No healthy food at 3am".into(),
            industry: "Food delivery".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_required_fields() {
        assert!(request().validate().is_ok());

        let mut missing = request();
        missing.problem_solving = "  ".into();
        match missing.validate() {
            Err(InputError::EmptyField { field }) => assert_eq!(field, "problem_solving"),
            other => panic!("Expected EmptyField, got {:?}", other),
        }

        let mut long = request();
        long.startup_idea = "x".repeat(MAX_FIELD_LENGTH + 1);
        assert!(matches!(long.validate(), Err(InputError::TooLong { .. })));
    }

    #[test]
    fn test_optional_treats_blank_as_absent() {
        assert_eq!(MarketRequest::optional(&Some("  ".into())), None);
        assert_eq!(MarketRequest::optional(&Some(" EU ".into())), Some("EU"));
        assert_eq!(MarketRequest::optional(&None), None);
    }

    #[test]
    fn test_segment_size_is_lenient() {
        assert_eq!(SegmentSize::from_label("Large"), SegmentSize::Large);
        assert_eq!(SegmentSize::from_label("small"), SegmentSize::Small);
        assert_eq!(SegmentSize::from_label("Small/Medium/Large"), SegmentSize::Small);
        assert_eq!(SegmentSize::from_label("huge"), SegmentSize::Medium);
        assert_eq!(serde_json::to_string(&SegmentSize::Large).unwrap(), "\"Large\"");
    }

    #[test]
    fn test_segment_lists_are_capped() {
        let segment: CustomerSegment = serde_json::from_str(
            r#"{"name": "Night nurses", "size": "LARGE", "key_characteristics": ["a", "b", "c", "d"], "extra": 1}"#,
        )
        .unwrap();
        assert_eq!(segment.size, SegmentSize::Large);
        assert_eq!(segment.key_characteristics, vec!["a", "b", "c"]);
        assert_eq!(segment.description, "");
    }

    #[test]
    fn test_competitor_map_defaults_missing_tiers() {
        let map: CompetitorMap = serde_json::from_str(
            r#"{"direct": [{"name": "HelloFresh", "strengths": ["brand", "scale", "logistics", "price"]}]}"#,
        )
        .unwrap();
        assert_eq!(map.direct.len(), 1);
        assert_eq!(map.direct[0].strengths.len(), 3);
        assert!(map.adjacent.is_empty());
        assert!(!map.is_empty());
        assert!(CompetitorMap::default().is_empty());
    }
}
