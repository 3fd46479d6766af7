//! Similarity of current flows to historical crisis patterns

use super::{
    compare_similarity, FlowWindow, HistoricalEvent, RiskBanner, SeriesNormalizer, SimilarityBand,
    SimilarityScore,
};
use crate::math::{distance_to_similarity, resampled_squared_distance};
use crate::shared::errors::AnalysisResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Window length and band cut-offs for pattern matching
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub max_points: usize,
    pub critical_above: f64,
    pub high_above: f64,
    pub medium_above: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_points: 20,
            critical_above: 85.0,
            high_above: 70.0,
            medium_above: 50.0,
        }
    }
}

/// Ranks historical events by how closely the recent window follows them
#[derive(Debug, Clone, Default)]
pub struct HistoricalPatternMatcher {
    config: MatchingConfig,
}

impl HistoricalPatternMatcher {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Similarity against every valid event, highest first
    pub fn rank(&self, window: &FlowWindow, library: &[HistoricalEvent]) -> AnalysisResult<Vec<SimilarityScore>> {
        let recent = window.truncate_to(self.config.max_points);
        let normalized = SeriesNormalizer::normalize(&recent)?;

        let mut scores: Vec<SimilarityScore> = library
            .iter()
            .filter(|event| match event.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping historical event: {}", e);
                    false
                }
            })
            .map(|event| {
                let (distance, len) = resampled_squared_distance(&normalized, &event.flow_pattern);
                SimilarityScore {
                    event_id: event.id.clone(),
                    event_name: event.name.clone(),
                    category: event.category,
                    similarity: distance_to_similarity(distance, len),
                }
            })
            .collect();

        scores.sort_by(compare_similarity);

        if let Some(top) = scores.first() {
            debug!(
                "{}: closest historical match {} at {:.1}%",
                window.protocol_id(),
                top.event_name,
                top.similarity
            );
        }
        Ok(scores)
    }

    pub fn band(&self, similarity: f64) -> SimilarityBand {
        if similarity > self.config.critical_above {
            SimilarityBand::Critical
        } else if similarity > self.config.high_above {
            SimilarityBand::High
        } else if similarity > self.config.medium_above {
            SimilarityBand::Medium
        } else {
            SimilarityBand::Low
        }
    }

    /// Banner for the top-ranked match; `None` when nothing was ranked
    pub fn assess(&self, scores: &[SimilarityScore]) -> Option<RiskBanner> {
        let top = scores.first()?;
        let level = self.band(top.similarity);
        let (message, recommendation) = match level {
            SimilarityBand::Critical => (
                format!(
                    "Current TVL flow pattern shows critical similarity ({:.1}%) to the {} event.",
                    top.similarity, top.event_name
                ),
                "Immediate investigation recommended. Consider emergency liquidity measures.",
            ),
            SimilarityBand::High => (
                format!(
                    "Current TVL flow pattern shows high similarity ({:.1}%) to the {} event.",
                    top.similarity, top.event_name
                ),
                "Elevated risk detected. Monitor closely and prepare contingency plans.",
            ),
            SimilarityBand::Medium => (
                format!(
                    "Current TVL flow pattern shows moderate similarity ({:.1}%) to the {} event.",
                    top.similarity, top.event_name
                ),
                "Some concerning patterns observed. Monitor for further developments.",
            ),
            SimilarityBand::Low => (
                format!(
                    "Current TVL flow shows low similarity ({:.1}%) to historical bank run or exploit patterns.",
                    top.similarity
                ),
                "No immediate concern. Continue routine monitoring.",
            ),
        };
        Some(RiskBanner {
            level,
            message,
            recommendation: recommendation.to_string(),
        })
    }
}
