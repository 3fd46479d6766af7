//! Portfolio domain - exposure join and risk recommendations

mod risk_aggregator;

pub use risk_aggregator::{PortfolioPolicy, PortfolioRiskAggregator};

use crate::shared::types::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's position in one protocol with the protocol's risk joined in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolExposure {
    pub protocol_id: String,
    pub protocol_name: String,
    pub amount: f64,
    pub percentage: f64,
    pub risk_score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Exit,
    Diversify,
    Rebalance,
    Hedge,
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecommendationType::Exit => "exit",
            RecommendationType::Diversify => "diversify",
            RecommendationType::Rebalance => "rebalance",
            RecommendationType::Hedge => "hedge",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRecommendation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<String>,
    pub action_steps: Vec<String>,
    /// Percentage points of portfolio risk removed by following the recommendation
    pub potential_risk_reduction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAssessment {
    pub total_value: f64,
    pub risk_score: f64,
    pub exposures: Vec<ProtocolExposure>,
    pub recommendations: Vec<RiskRecommendation>,
}
