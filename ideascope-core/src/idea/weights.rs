//! Dimension weights and the weighted 0-100 aggregate.

use super::dimension::Dimension;
use crate::error::ConfigError;
use serde::Serialize;
use std::collections::BTreeMap;

const SUM_TOLERANCE: f64 = 1e-9;

/// Mapping from dimension to weight. Weights are in `(0, 1]` and sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightingTable {
    weights: BTreeMap<Dimension, f64>,
}

impl WeightingTable {
    /// The standard weighting: novelty 30%, feasibility 20%, market overlap 15%,
    /// patent risk 20%, implementation complexity 10%, ethical/regulatory 5%.
    pub fn standard() -> Self {
        let weights = BTreeMap::from([
            (Dimension::Novelty, 0.30),
            (Dimension::TechnicalFeasibility, 0.20),
            (Dimension::MarketOverlap, 0.15),
            (Dimension::PatentRisk, 0.20),
            (Dimension::ImplementationComplexity, 0.10),
            (Dimension::EthicalRegulatory, 0.05),
        ]);
        Self { weights }
    }

    /// Build a table from a user-supplied map, rejecting anything that would
    /// distort the 0-100 scale.
    pub fn from_map(weights: &BTreeMap<Dimension, f64>) -> Result<Self, ConfigError> {
        for dimension in Dimension::ALL {
            match weights.get(&dimension) {
                None => {
                    return Err(ConfigError::Invalid {
                        message: format!("scoring.weights is missing '{dimension}'"),
                    });
                }
                Some(w) if !(*w > 0.0 && *w <= 1.0) => {
                    return Err(ConfigError::Invalid {
                        message: format!(
                            "scoring.weights.{dimension} must be in (0, 1], got {w}"
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        let table = Self {
            weights: weights.clone(),
        };
        let sum = table.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(ConfigError::WeightsNotNormalized { sum });
        }
        Ok(table)
    }

    pub fn weight(&self, dimension: Dimension) -> f64 {
        self.weights.get(&dimension).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.weight(*d)).sum()
    }

    /// `Σ (score / 10) * weight * 100`, rounded to one decimal.
    ///
    /// Scores are expected in `[0, 10]`; a dimension absent from `scores`
    /// contributes nothing.
    pub fn weighted_total<I>(&self, scores: I) -> f64
    where
        I: IntoIterator<Item = (Dimension, f64)>,
    {
        let total: f64 = scores
            .into_iter()
            .map(|(dimension, score)| (score / 10.0) * self.weight(dimension) * 100.0)
            .sum();
        round_one_decimal(total)
    }
}

impl Default for WeightingTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(score: f64) -> Vec<(Dimension, f64)> {
        Dimension::ALL.iter().map(|d| (*d, score)).collect()
    }

    #[test]
    fn test_standard_weights_sum_to_one() {
        let table = WeightingTable::standard();
        assert!((table.sum() - 1.0).abs() <= 1e-9);
        assert_eq!(table.weight(Dimension::Novelty), 0.30);
        assert_eq!(table.weight(Dimension::EthicalRegulatory), 0.05);
    }

    #[test]
    fn test_extremes() {
        let table = WeightingTable::standard();
        assert_eq!(table.weighted_total(uniform(10.0)), 100.0);
        assert_eq!(table.weighted_total(uniform(0.0)), 0.0);
        assert_eq!(table.weighted_total(uniform(5.0)), 50.0);
    }

    #[test]
    fn test_mixed_scores() {
        // 24 + 12 + 10.5 + 18 + 5 + 5
        let scores = [
            (Dimension::Novelty, 8.0),
            (Dimension::TechnicalFeasibility, 6.0),
            (Dimension::MarketOverlap, 7.0),
            (Dimension::PatentRisk, 9.0),
            (Dimension::ImplementationComplexity, 5.0),
            (Dimension::EthicalRegulatory, 10.0),
        ];
        assert_eq!(WeightingTable::standard().weighted_total(scores), 74.5);
    }

    #[test]
    fn test_all_neutral_except_patent_freedom() {
        // The all-fallback run: five neutral scores plus a clear patent landscape.
        let mut scores = uniform(5.0);
        scores[3] = (Dimension::PatentRisk, 9.0);
        assert_eq!(WeightingTable::standard().weighted_total(scores), 58.0);
    }

    #[test]
    fn test_from_map_accepts_normalized() {
        let weights: BTreeMap<_, _> = Dimension::ALL.iter().map(|d| (*d, 1.0 / 6.0)).collect();
        let table = WeightingTable::from_map(&weights).unwrap();
        assert_eq!(table.weighted_total(uniform(10.0)), 100.0);
    }

    #[test]
    fn test_from_map_rejects_bad_sum() {
        let weights: BTreeMap<_, _> = Dimension::ALL.iter().map(|d| (*d, 0.1)).collect();
        match WeightingTable::from_map(&weights) {
            Err(ConfigError::WeightsNotNormalized { sum }) => assert!((sum - 0.6).abs() < 1e-9),
            other => panic!("Expected WeightsNotNormalized, got {:?}", other),
        }
    }

    #[test]
    fn test_from_map_rejects_missing_and_out_of_range() {
        let mut weights: BTreeMap<_, _> = Dimension::ALL.iter().map(|d| (*d, 0.2)).collect();
        weights.remove(&Dimension::PatentRisk);
        assert!(matches!(
            WeightingTable::from_map(&weights),
            Err(ConfigError::Invalid { .. })
        ));

        weights.insert(Dimension::PatentRisk, 0.0);
        assert!(matches!(
            WeightingTable::from_map(&weights),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
