//! Scoring domain - weighted aggregation of protocol sub-scores

mod multi_factor;
mod health;
mod reputation;
mod risk_components;

pub use multi_factor::MultiFactorScorer;
pub use health::{HealthScorer, HealthWeights};
pub use reputation::{TrustAssessment, TrustScorer, TrustWeights, VerificationStatus};
pub use risk_components::{RiskComponentScorer, RiskComponentWeights};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named sub-score and its share of the aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedMetric {
    pub name: String,
    pub score: f64,
    pub weight: f64,
}

impl WeightedMetric {
    pub fn new(name: impl Into<String>, score: f64, weight: f64) -> Self {
        Self {
            name: name.into(),
            score,
            weight,
        }
    }
}

/// Rounded weighted sum together with the metrics it was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateScore {
    pub value: f64,
    pub components: Vec<WeightedMetric>,
}

/// Five-band label of a health score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthBand {
    Excellent,
    Good,
    Moderate,
    Concerning,
    Critical,
}

impl HealthBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthBand::Excellent
        } else if score >= 60.0 {
            HealthBand::Good
        } else if score >= 40.0 {
            HealthBand::Moderate
        } else if score >= 20.0 {
            HealthBand::Concerning
        } else {
            HealthBand::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthBand::Excellent => "Excellent",
            HealthBand::Good => "Good",
            HealthBand::Moderate => "Moderate",
            HealthBand::Concerning => "Concerning",
            HealthBand::Critical => "Critical",
        }
    }
}

impl fmt::Display for HealthBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Four-band label of a trust score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustBand {
    High,
    Good,
    Medium,
    Low,
}

impl TrustBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            TrustBand::High
        } else if score >= 60.0 {
            TrustBand::Good
        } else if score >= 40.0 {
            TrustBand::Medium
        } else {
            TrustBand::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrustBand::High => "High Trust",
            TrustBand::Good => "Good",
            TrustBand::Medium => "Medium Trust",
            TrustBand::Low => "Low Trust",
        }
    }
}

impl fmt::Display for TrustBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
