//! Reputation and trust score

use super::{AggregateScore, MultiFactorScorer, TrustBand, WeightedMetric};
use crate::shared::errors::AnalysisResult;
use crate::shared::types::ReputationRecord;
use serde::{Deserialize, Serialize};

/// Weights of the four trust metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustWeights {
    pub transparency: f64,
    pub developer: f64,
    pub community: f64,
    pub incident_response: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            transparency: 0.30,
            developer: 0.25,
            community: 0.25,
            incident_response: 0.20,
        }
    }
}

impl TrustWeights {
    pub fn validate(&self) -> AnalysisResult<()> {
        MultiFactorScorer::check_weights([
            self.transparency,
            self.developer,
            self.community,
            self.incident_response,
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Partial,
    Unverified,
}

impl VerificationStatus {
    pub fn from_trust_score(score: f64) -> Self {
        if score > 75.0 {
            VerificationStatus::Verified
        } else if score > 50.0 {
            VerificationStatus::Partial
        } else {
            VerificationStatus::Unverified
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Partial => "partially verified",
            VerificationStatus::Unverified => "unverified",
        }
    }
}

/// Trust score plus the derived labels shown next to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustAssessment {
    pub score: AggregateScore,
    pub band: TrustBand,
    pub verification: VerificationStatus,
    /// Mean of scored audits, `None` without audit history
    pub audit_average: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TrustScorer {
    weights: TrustWeights,
}

impl TrustScorer {
    pub fn new(weights: TrustWeights) -> Self {
        Self { weights }
    }

    pub fn metrics(&self, record: &ReputationRecord) -> Vec<WeightedMetric> {
        vec![
            WeightedMetric::new("Transparency", record.transparency_score, self.weights.transparency),
            WeightedMetric::new("Developer Activity", record.developer_score, self.weights.developer),
            WeightedMetric::new("Community", record.community_score, self.weights.community),
            WeightedMetric::new("Incident Response", record.incident_response_score, self.weights.incident_response),
        ]
    }

    pub fn assess(&self, record: &ReputationRecord) -> AnalysisResult<TrustAssessment> {
        let score = MultiFactorScorer::score(&self.metrics(record))?;
        let scored: Vec<f64> = record.audit_history.iter().filter_map(|a| a.score).collect();
        let audit_average = if scored.is_empty() {
            None
        } else {
            Some(scored.iter().sum::<f64>() / scored.len() as f64)
        };

        Ok(TrustAssessment {
            band: TrustBand::from_score(score.value),
            verification: VerificationStatus::from_trust_score(score.value),
            audit_average,
            score,
        })
    }
}
