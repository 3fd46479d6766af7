//! Portfolio-level risk score and recommendation rules

use super::{PortfolioAssessment, ProtocolExposure, RecommendationType, RiskRecommendation};
use crate::math::weighted_mean;
use crate::shared::types::{ExposureRecord, ProtocolRecord, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Policy thresholds of the recommendation rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioPolicy {
    pub exit_risk: u8,
    pub exit_critical_risk: u8,
    pub exit_reduction_factor: f64,
    pub concentration_pct: f64,
    pub diversify_reduction: f64,
    pub rebalance_risk: f64,
    pub rebalance_critical_risk: f64,
    pub rebalance_reduction: f64,
}

impl Default for PortfolioPolicy {
    fn default() -> Self {
        Self {
            exit_risk: 70,
            exit_critical_risk: 85,
            exit_reduction_factor: 0.8,
            concentration_pct: 40.0,
            diversify_reduction: 5.0,
            rebalance_risk: 65.0,
            rebalance_critical_risk: 80.0,
            rebalance_reduction: 15.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioRiskAggregator {
    policy: PortfolioPolicy,
}

impl PortfolioRiskAggregator {
    pub fn new(policy: PortfolioPolicy) -> Self {
        Self { policy }
    }

    /// Join raw holdings with protocol records. Holdings in unknown protocols
    /// or with a negative amount are skipped.
    pub fn join(&self, holdings: &[ExposureRecord], protocols: &[ProtocolRecord]) -> Vec<ProtocolExposure> {
        let by_address: HashMap<String, &ProtocolRecord> = protocols
            .iter()
            .map(|p| (p.address.to_lowercase(), p))
            .collect();

        let known: Vec<(&ExposureRecord, &ProtocolRecord)> = holdings
            .iter()
            .filter_map(|h| {
                if !h.amount.is_finite() || h.amount < 0.0 {
                    warn!("Skipping holding in {} with invalid amount {}", h.protocol_address, h.amount);
                    return None;
                }
                match by_address.get(&h.protocol_address.to_lowercase()) {
                    Some(protocol) => Some((h, *protocol)),
                    None => {
                        warn!("Skipping holding in unknown protocol {}", h.protocol_address);
                        None
                    }
                }
            })
            .collect();

        let total: f64 = known.iter().map(|(h, _)| h.amount).sum();
        known
            .into_iter()
            .map(|(holding, protocol)| ProtocolExposure {
                protocol_id: protocol.address.clone(),
                protocol_name: protocol.name.clone(),
                amount: holding.amount,
                percentage: if total > 0.0 { holding.amount / total * 100.0 } else { 0.0 },
                risk_score: protocol.risk_score,
            })
            .collect()
    }

    /// Exposure-weighted mean of protocol risk scores
    pub fn weighted_risk_score(&self, exposures: &[ProtocolExposure]) -> f64 {
        weighted_mean(exposures.iter().map(|e| (e.risk_score as f64, e.amount)))
    }

    /// Apply the recommendation rules to `exposures` under the portfolio score `risk_score`
    pub fn assess(&self, exposures: &[ProtocolExposure], risk_score: f64) -> PortfolioAssessment {
        let recommendations = self.recommend(exposures, risk_score);
        debug!(
            "Portfolio of {} exposures at risk {:.1}: {} recommendations",
            exposures.len(),
            risk_score,
            recommendations.len()
        );
        PortfolioAssessment {
            total_value: exposures.iter().map(|e| e.amount).sum(),
            risk_score,
            exposures: exposures.to_vec(),
            recommendations,
        }
    }

    /// Join, score by exposure weight and assess in one step
    pub fn assess_holdings(&self, holdings: &[ExposureRecord], protocols: &[ProtocolRecord]) -> PortfolioAssessment {
        let exposures = self.join(holdings, protocols);
        let risk_score = self.weighted_risk_score(&exposures);
        self.assess(&exposures, risk_score)
    }

    fn recommend(&self, exposures: &[ProtocolExposure], risk_score: f64) -> Vec<RiskRecommendation> {
        let p = &self.policy;
        let mut seen: HashSet<(RecommendationType, String)> = HashSet::new();
        let mut recommendations = Vec::new();

        for exposure in exposures.iter().filter(|e| e.risk_score >= p.exit_risk) {
            if !seen.insert((RecommendationType::Exit, exposure.protocol_id.clone())) {
                continue;
            }
            recommendations.push(RiskRecommendation {
                id: format!("exit-{}", exposure.protocol_id),
                kind: RecommendationType::Exit,
                description: format!(
                    "Exit {} due to high risk score ({}/100)",
                    exposure.protocol_name, exposure.risk_score
                ),
                severity: if exposure.risk_score >= p.exit_critical_risk {
                    Severity::Critical
                } else {
                    Severity::High
                },
                protocol_id: Some(exposure.protocol_id.clone()),
                action_steps: vec![
                    format!(
                        "Withdraw your assets ({:.2} USD) from {}",
                        exposure.amount, exposure.protocol_name
                    ),
                    "Move to a lower risk protocol or stablecoin position".to_string(),
                ],
                potential_risk_reduction: (exposure.risk_score as f64 * exposure.percentage / 100.0)
                    * p.exit_reduction_factor,
            });
        }

        for exposure in exposures.iter().filter(|e| e.percentage > p.concentration_pct) {
            if !seen.insert((RecommendationType::Diversify, exposure.protocol_id.clone())) {
                continue;
            }
            recommendations.push(RiskRecommendation {
                id: format!("diversify-{}", exposure.protocol_id),
                kind: RecommendationType::Diversify,
                description: format!(
                    "Reduce concentration in {} ({:.1}% of portfolio)",
                    exposure.protocol_name, exposure.percentage
                ),
                severity: Severity::Medium,
                protocol_id: Some(exposure.protocol_id.clone()),
                action_steps: vec![
                    format!("Reduce position in {} by at least 20%", exposure.protocol_name),
                    "Spread assets across 3-5 different protocols with low correlation".to_string(),
                ],
                potential_risk_reduction: p.diversify_reduction,
            });
        }

        if risk_score > p.rebalance_risk {
            recommendations.push(RiskRecommendation {
                id: "rebalance-portfolio".to_string(),
                kind: RecommendationType::Rebalance,
                description: "Rebalance portfolio to reduce overall risk exposure".to_string(),
                severity: if risk_score > p.rebalance_critical_risk {
                    Severity::Critical
                } else {
                    Severity::High
                },
                protocol_id: None,
                action_steps: vec![
                    "Reduce exposure to high-risk protocols".to_string(),
                    "Increase allocation to protocols with risk scores below 40".to_string(),
                    "Consider adding stablecoin positions as a safety measure".to_string(),
                ],
                potential_risk_reduction: p.rebalance_reduction,
            });
        }

        recommendations
    }
}
