//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use ideascope_core::budget::SearchBudget;
use ideascope_core::extract::{JsonShape, extract_json, extract_or};
use ideascope_core::idea::patents::{PatentRecord, assess_patent_risk, dedup_patents};
use ideascope_core::idea::{Dimension, WeightingTable};
use std::time::Duration;

fn record(id: u8) -> PatentRecord {
    PatentRecord {
        id: format!("US{:07}", id),
        title: String::new(),
        summary: String::new(),
        filing_date: "Unknown".into(),
        status: "Unknown".into(),
        link: String::new(),
    }
}

// --- Weighted aggregate properties ---

proptest! {
    #[test]
    fn weighted_total_stays_in_range(scores in prop::array::uniform6(0.0f64..=10.0)) {
        let table = WeightingTable::standard();
        let total = table.weighted_total(Dimension::ALL.iter().copied().zip(scores));
        prop_assert!((0.0..=100.0).contains(&total));
    }

    #[test]
    fn weighted_total_is_monotonic(
        scores in prop::array::uniform6(0.0f64..=9.0),
        index in 0usize..6,
    ) {
        let table = WeightingTable::standard();
        let mut raised = scores;
        raised[index] += 1.0;
        let before = table.weighted_total(Dimension::ALL.iter().copied().zip(scores));
        let after = table.weighted_total(Dimension::ALL.iter().copied().zip(raised));
        prop_assert!(after >= before);
    }

    #[test]
    fn weighted_total_has_one_decimal(scores in prop::array::uniform6(0.0f64..=10.0)) {
        let total = WeightingTable::standard()
            .weighted_total(Dimension::ALL.iter().copied().zip(scores));
        prop_assert!(((total * 10.0).round() - total * 10.0).abs() < 1e-6);
    }
}

// --- Patent risk properties ---

proptest! {
    #[test]
    fn risk_never_increases_with_count(count in 0usize..50) {
        prop_assert!(assess_patent_risk(count + 1).score <= assess_patent_risk(count).score);
    }

    #[test]
    fn risk_explanation_mentions_count(count in 1usize..50) {
        let risk = assess_patent_risk(count);
        let expected = format!("Found {} related patents", count);
        prop_assert!(risk.explanation.contains(&expected));
    }

    #[test]
    fn dedup_yields_unique_ids_in_first_seen_order(ids in prop::collection::vec(0u8..20, 0..40)) {
        let unique = dedup_patents(ids.iter().map(|id| record(*id)), 15);
        prop_assert!(unique.len() <= 15);

        let mut expected = Vec::new();
        for id in &ids {
            let key = format!("US{:07}", id);
            if !expected.contains(&key) {
                expected.push(key);
            }
        }
        expected.truncate(15);
        let got: Vec<String> = unique.into_iter().map(|r| r.id).collect();
        prop_assert_eq!(got, expected);
    }
}

// --- Extraction properties ---

proptest! {
    #[test]
    fn extraction_never_panics(text in ".*") {
        let _ = extract_json(&text, JsonShape::Object);
        let _ = extract_json(&text, JsonShape::Array);
    }

    #[test]
    fn non_json_text_yields_default(text in "[a-zA-Z ,.!?]*") {
        let result = extract_or(&text, JsonShape::Object, 42i64);
        prop_assert!(!result.is_parsed());
        prop_assert_eq!(result.into_inner(), 42);
    }

    #[test]
    fn embedded_object_is_found(
        prefix in "[a-zA-Z ,.:]*",
        suffix in "[a-zA-Z ,.]*",
        score in 0u8..=10,
    ) {
        let text = format!("{}{{\"score\": {}}}{}", prefix, score, suffix);
        let value = extract_json(&text, JsonShape::Object).unwrap();
        prop_assert_eq!(value["score"].as_u64(), Some(score as u64));
    }
}

// --- Budget properties ---

proptest! {
    #[test]
    fn budget_grants_at_most_max(max in 0usize..10, attempts in 0usize..30) {
        let budget = SearchBudget::new(max, Duration::ZERO);
        let granted = (0..attempts).filter(|_| budget.try_acquire().is_some()).count();
        prop_assert_eq!(granted, attempts.min(max));
        prop_assert_eq!(budget.used(), attempts.min(max));
    }
}
