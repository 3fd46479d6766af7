//! Protocol health score

use super::{AggregateScore, HealthBand, MultiFactorScorer, WeightedMetric};
use crate::math::{clamp_score, MAX_SCORE};
use crate::shared::errors::AnalysisResult;
use crate::shared::types::ProtocolRecord;
use rand::Rng;
use serde::{Deserialize, Serialize};

const ANOMALY_PENALTY: f64 = 5.0;
const DEEP_LIQUIDITY_TVL: f64 = 10_000_000.0;
const MODERATE_LIQUIDITY_TVL: f64 = 1_000_000.0;

/// Weights of the seven health metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthWeights {
    pub security: f64,
    pub liquidity: f64,
    pub governance: f64,
    pub transparency: f64,
    pub market: f64,
    pub user_experience: f64,
    pub community: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            security: 0.30,
            liquidity: 0.20,
            governance: 0.15,
            transparency: 0.15,
            market: 0.10,
            user_experience: 0.05,
            community: 0.05,
        }
    }
}

impl HealthWeights {
    pub fn validate(&self) -> AnalysisResult<()> {
        MultiFactorScorer::check_weights(self.as_array().map(|(_, w)| w))
    }

    fn as_array(&self) -> [(Category, f64); 7] {
        [
            (Category::Security, self.security),
            (Category::Liquidity, self.liquidity),
            (Category::Governance, self.governance),
            (Category::Transparency, self.transparency),
            (Category::Market, self.market),
            (Category::UserExperience, self.user_experience),
            (Category::Community, self.community),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Security,
    Liquidity,
    Governance,
    Transparency,
    Market,
    UserExperience,
    Community,
}

impl Category {
    fn name(&self) -> &'static str {
        match self {
            Category::Security => "Smart Contract Security",
            Category::Liquidity => "Liquidity Depth",
            Category::Governance => "Governance",
            Category::Transparency => "Transparency",
            Category::Market => "Market Risk",
            Category::UserExperience => "User Experience",
            Category::Community => "Community Engagement",
        }
    }
}

/// Derives the seven health metrics from a protocol record and aggregates them
#[derive(Debug, Clone, Default)]
pub struct HealthScorer {
    weights: HealthWeights,
}

impl HealthScorer {
    pub fn new(weights: HealthWeights) -> Self {
        Self { weights }
    }

    pub fn derive_metrics(&self, protocol: &ProtocolRecord) -> Vec<WeightedMetric> {
        self.build_metrics(protocol, |_| 0.0)
    }

    /// Same as `derive_metrics` with a uniform +/-10 variation per metric drawn
    /// from the supplied generator. Used for demo data only.
    pub fn derive_metrics_with_jitter<R: Rng>(
        &self,
        protocol: &ProtocolRecord,
        rng: &mut R,
    ) -> Vec<WeightedMetric> {
        self.build_metrics(protocol, |_| rng.gen_range(-10.0..10.0))
    }

    pub fn score(&self, protocol: &ProtocolRecord) -> AnalysisResult<(AggregateScore, HealthBand)> {
        let aggregate = MultiFactorScorer::score(&self.derive_metrics(protocol))?;
        let band = HealthBand::from_score(aggregate.value);
        Ok((aggregate, band))
    }

    fn build_metrics(
        &self,
        protocol: &ProtocolRecord,
        mut jitter: impl FnMut(Category) -> f64,
    ) -> Vec<WeightedMetric> {
        let base = (MAX_SCORE - protocol.risk_score as f64).max(0.0);
        let anomaly_penalty = protocol.anomaly_count as f64 * ANOMALY_PENALTY;

        self.weights
            .as_array()
            .into_iter()
            .map(|(category, weight)| {
                let mut score = base + jitter(category);
                match category {
                    Category::Security | Category::Governance => score -= anomaly_penalty,
                    Category::Liquidity if protocol.tvl > 0.0 => {
                        score += if protocol.tvl > DEEP_LIQUIDITY_TVL {
                            15.0
                        } else if protocol.tvl > MODERATE_LIQUIDITY_TVL {
                            5.0
                        } else {
                            -5.0
                        };
                    }
                    _ => {}
                }
                WeightedMetric::new(category.name(), clamp_score(score), weight)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_health_metrics_follow_protocol_attributes() {
        let protocol = ProtocolRecord::new("0x1", "Aave", 30, 50_000_000.0).with_anomaly_count(1);
        let metrics = HealthScorer::default().derive_metrics(&protocol);

        assert_eq!(metrics.len(), 7);
        assert_eq!(metrics[0].name, "Smart Contract Security");
        assert_eq!(metrics[0].score, 65.0);
        assert_eq!(metrics[1].score, 85.0);
        assert_eq!(metrics[2].score, 65.0);
        assert_eq!(metrics[3].score, 70.0);
    }

    #[test]
    fn test_health_score_is_weighted_and_banded() {
        let protocol = ProtocolRecord::new("0x1", "Aave", 30, 50_000_000.0).with_anomaly_count(1);
        let (score, band) = HealthScorer::default().score(&protocol).unwrap();
        // 65*.3 + 85*.2 + 65*.15 + 70*.15 + 70*.1 + 70*.05 + 70*.05 = 70.75
        assert_eq!(score.value, 71.0);
        assert_eq!(band, HealthBand::Good);
    }

    #[test]
    fn test_scores_are_clamped() {
        let protocol = ProtocolRecord::new("0x2", "Risky", 100, 10.0).with_anomaly_count(9);
        let metrics = HealthScorer::default().derive_metrics(&protocol);
        assert!(metrics.iter().all(|m| m.score == 0.0));
        let (score, band) = HealthScorer::default().score(&protocol).unwrap();
        assert_eq!(score.value, 0.0);
        assert_eq!(band, HealthBand::Critical);
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let protocol = ProtocolRecord::new("0x3", "Curve", 45, 2_000_000.0);
        let scorer = HealthScorer::default();
        let a = scorer.derive_metrics_with_jitter(&protocol, &mut StdRng::seed_from_u64(7));
        let b = scorer.derive_metrics_with_jitter(&protocol, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.iter().all(|m| (0.0..=100.0).contains(&m.score)));
    }

    #[test]
    fn test_default_weights_are_valid() {
        assert!(HealthWeights::default().validate().is_ok());
        let broken = HealthWeights { security: 0.5, ..HealthWeights::default() };
        assert!(broken.validate().is_err());
    }
}
