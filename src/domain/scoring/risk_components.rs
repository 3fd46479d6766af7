//! Synthetic risk assessment from TVL, age, volatility and audit inputs.
//! Higher values mean riskier, unlike the health and trust scores.

use super::{AggregateScore, MultiFactorScorer, WeightedMetric};
use crate::math::clamp_score;
use crate::shared::errors::AnalysisResult;
use crate::shared::types::ProtocolRecord;
use serde::{Deserialize, Serialize};

/// Component value used when the collaborator did not supply the input
pub const NEUTRAL_RISK: f64 = 50.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskComponentWeights {
    pub tvl: f64,
    pub volatility: f64,
    pub age: f64,
    pub audit: f64,
}

impl Default for RiskComponentWeights {
    fn default() -> Self {
        Self {
            tvl: 0.4,
            volatility: 0.2,
            age: 0.2,
            audit: 0.2,
        }
    }
}

impl RiskComponentWeights {
    pub fn validate(&self) -> AnalysisResult<()> {
        MultiFactorScorer::check_weights([self.tvl, self.volatility, self.age, self.audit])
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskComponentScorer {
    weights: RiskComponentWeights,
}

impl RiskComponentScorer {
    pub fn new(weights: RiskComponentWeights) -> Self {
        Self { weights }
    }

    pub fn tvl_risk(tvl: f64) -> f64 {
        if tvl <= 0.0 {
            100.0
        } else if tvl < 100_000.0 {
            90.0
        } else if tvl < 1_000_000.0 {
            70.0
        } else if tvl < 10_000_000.0 {
            50.0
        } else if tvl < 100_000_000.0 {
            30.0
        } else {
            10.0
        }
    }

    pub fn age_risk(age_days: f64) -> f64 {
        if age_days < 30.0 {
            90.0
        } else if age_days < 90.0 {
            70.0
        } else if age_days < 180.0 {
            50.0
        } else if age_days < 365.0 {
            30.0
        } else {
            10.0
        }
    }

    /// `now` is the unix time the protocol age is measured against
    pub fn assess(&self, protocol: &ProtocolRecord, now: i64) -> AnalysisResult<AggregateScore> {
        let age = protocol
            .created_at
            .map(|created| Self::age_risk((now - created) as f64 / SECONDS_PER_DAY))
            .unwrap_or(NEUTRAL_RISK);
        let volatility = protocol
            .volatility
            .map(|v| clamp_score((v * 100.0).round()))
            .unwrap_or(NEUTRAL_RISK);
        let audit = protocol
            .audit_risk
            .map(|a| clamp_score(a as f64))
            .unwrap_or(NEUTRAL_RISK);

        MultiFactorScorer::score(&[
            WeightedMetric::new("TVL Risk", Self::tvl_risk(protocol.tvl), self.weights.tvl),
            WeightedMetric::new("Volatility Risk", volatility, self.weights.volatility),
            WeightedMetric::new("Age Risk", age, self.weights.age),
            WeightedMetric::new("Audit Risk", audit, self.weights.audit),
        ])
    }
}
