//! Generic weighted aggregation

use super::{AggregateScore, WeightedMetric};
use crate::math::{weighted_sum, MAX_SCORE};
use crate::shared::errors::{AnalysisError, AnalysisResult};

/// Allowed distance of the weight total from 1.0
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Combines sub-scores into a single 0-100 score
pub struct MultiFactorScorer;

impl MultiFactorScorer {
    /// `value = round(sum(score * weight))`; weights are never renormalized
    pub fn score(metrics: &[WeightedMetric]) -> AnalysisResult<AggregateScore> {
        Self::check_weights(metrics.iter().map(|m| m.weight))?;

        if let Some(bad) = metrics
            .iter()
            .find(|m| !m.score.is_finite() || m.score < 0.0 || m.score > MAX_SCORE)
        {
            return Err(AnalysisError::InvalidInput(format!(
                "metric {} has score {} outside 0-100",
                bad.name, bad.score
            )));
        }

        let value = weighted_sum(metrics.iter().map(|m| (m.score, m.weight))).round();
        Ok(AggregateScore {
            value,
            components: metrics.to_vec(),
        })
    }

    /// Every weight must be in (0, 1] and the total within tolerance of 1.0
    pub fn check_weights(weights: impl IntoIterator<Item = f64>) -> AnalysisResult<()> {
        let mut sum = 0.0;
        for weight in weights {
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(AnalysisError::InvalidWeights { sum: weight });
            }
            sum += weight;
        }
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(AnalysisError::InvalidWeights { sum });
        }
        Ok(())
    }
}
