//! Outflow velocity checks over a TVL window

use super::{AnomalyResult, FlowWindow};
use crate::math::calculate_percentage_change;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Policy thresholds for the outflow check.
/// Rates are fractions of the initial TVL per hour, changes are percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutflowThresholds {
    pub moderate_rate_per_hour: f64,
    pub severe_rate_per_hour: f64,
    pub moderate_change_pct: f64,
    pub severe_change_pct: f64,
    pub min_hours: f64,
}

impl Default for OutflowThresholds {
    fn default() -> Self {
        Self {
            moderate_rate_per_hour: 0.02,
            severe_rate_per_hour: 0.05,
            moderate_change_pct: -5.0,
            severe_change_pct: -10.0,
            min_hours: 1.0,
        }
    }
}

/// Classifies TVL outflow velocity of a protocol
#[derive(Debug, Clone, Default)]
pub struct OutflowAnomalyDetector {
    thresholds: OutflowThresholds,
}

impl OutflowAnomalyDetector {
    pub fn new(thresholds: OutflowThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &OutflowThresholds {
        &self.thresholds
    }

    /// The window is expected to be pre-filtered to the desired lookback
    pub fn detect(&self, window: &FlowWindow) -> AnomalyResult {
        let first = window.first();
        let last = window.last();
        let initial_tvl = first.tvl;
        let current_tvl = last.tvl;

        let percentage_change = calculate_percentage_change(initial_tvl, current_tvl);
        let hours_diff = ((last.timestamp - first.timestamp) as f64 / 3600.0).max(self.thresholds.min_hours);
        let outflow_rate_per_hour = (initial_tvl - current_tvl) / hours_diff;

        let t = &self.thresholds;
        let is_anomaly = outflow_rate_per_hour > initial_tvl * t.moderate_rate_per_hour
            && percentage_change < t.moderate_change_pct;
        let is_severe = outflow_rate_per_hour > initial_tvl * t.severe_rate_per_hour
            && percentage_change < t.severe_change_pct;

        debug!(
            "{}: change {:.2}% over {:.2}h, outflow {:.2}/h (anomaly={}, severe={})",
            window.protocol_id(),
            percentage_change,
            hours_diff,
            outflow_rate_per_hour,
            is_anomaly,
            is_severe
        );

        AnomalyResult {
            initial_tvl,
            current_tvl,
            percentage_change,
            hours_diff,
            outflow_rate_per_hour,
            is_anomaly,
            is_severe,
        }
    }
}
