//! Severity classification of liquidity movements

use super::{Alert, AlertKind};
use crate::domain::liquidity::AnomalyResult;
use crate::shared::types::{FlowBaseline, ProtocolRecord, Severity};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Alert policy; the critical threshold is a magnitude in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
    pub critical_threshold_pct: f64,
    pub high_rate_multiple: f64,
    pub volatility_sigma: f64,
    pub inflow_significance_pct: f64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            critical_threshold_pct: 25.0,
            high_rate_multiple: 3.0,
            volatility_sigma: 2.0,
            inflow_significance_pct: 10.0,
        }
    }
}

/// A movement to classify. `rate_multiple` compares the current outflow rate
/// with the prior average; `deviation_sigma` is the distance from the 7-day
/// average change in standard deviations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowSignal {
    pub kind: AlertKind,
    pub percentage_change: f64,
    pub rate_multiple: Option<f64>,
    pub deviation_sigma: Option<f64>,
}

impl FlowSignal {
    pub fn new(kind: AlertKind, percentage_change: f64) -> Self {
        Self {
            kind,
            percentage_change,
            rate_multiple: None,
            deviation_sigma: None,
        }
    }

    pub fn with_rate_multiple(mut self, multiple: f64) -> Self {
        self.rate_multiple = Some(multiple);
        self
    }

    pub fn with_deviation_sigma(mut self, sigma: f64) -> Self {
        self.deviation_sigma = Some(sigma);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertClassifier {
    policy: AlertPolicy,
}

impl AlertClassifier {
    pub fn new(policy: AlertPolicy) -> Self {
        Self { policy }
    }

    pub fn severity(&self, signal: &FlowSignal) -> Severity {
        let p = &self.policy;
        match signal.kind {
            AlertKind::Inflow => Severity::Low,
            AlertKind::Outflow if signal.percentage_change < -p.critical_threshold_pct => Severity::Critical,
            AlertKind::Outflow if signal.rate_multiple.is_some_and(|m| m >= p.high_rate_multiple) => Severity::High,
            _ if signal.deviation_sigma.is_some_and(|s| s > p.volatility_sigma) => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// The id names the condition, not the pass: the same severity and kind
    /// on the same protocol always map to the same id.
    pub fn classify(&self, protocol: &ProtocolRecord, signal: &FlowSignal, timestamp: i64) -> Alert {
        let severity = self.severity(signal);
        Alert {
            id: format!(
                "alert-{}-{}-{}",
                severity,
                signal.kind.as_str(),
                protocol.address.to_ascii_lowercase()
            ),
            protocol_name: protocol.name.clone(),
            protocol_address: protocol.address.clone(),
            severity,
            kind: signal.kind,
            timestamp,
            message: Self::message(severity, signal),
            percentage_change: signal.percentage_change,
            is_read: false,
        }
    }

    /// Build the signal for an outflow check, using the baseline when one is known
    pub fn signal_from_anomaly(&self, result: &AnomalyResult, baseline: Option<&FlowBaseline>) -> FlowSignal {
        let rate_multiple = baseline
            .filter(|b| b.avg_hourly_outflow > 0.0)
            .map(|b| result.outflow_rate_per_hour / b.avg_hourly_outflow);
        let deviation_sigma = baseline
            .filter(|b| b.std_dev_change_pct > 0.0)
            .map(|b| (result.percentage_change - b.avg_change_pct).abs() / b.std_dev_change_pct);

        let kind = if result.percentage_change > 0.0 {
            AlertKind::Inflow
        } else if !result.is_anomaly && deviation_sigma.is_some_and(|s| s > self.policy.volatility_sigma) {
            AlertKind::Volatility
        } else {
            AlertKind::Outflow
        };

        FlowSignal {
            kind,
            percentage_change: result.percentage_change,
            rate_multiple,
            deviation_sigma,
        }
    }

    /// Alert for an outflow check, or `None` when the window is unremarkable
    pub fn classify_anomaly(
        &self,
        protocol: &ProtocolRecord,
        result: &AnomalyResult,
        baseline: Option<&FlowBaseline>,
        timestamp: i64,
    ) -> Option<Alert> {
        let signal = self.signal_from_anomaly(result, baseline);
        let severity = self.severity(&signal);
        let notable = result.is_anomaly
            || severity > Severity::Low
            || (signal.kind == AlertKind::Inflow && signal.percentage_change >= self.policy.inflow_significance_pct);

        if !notable {
            debug!("{}: no alert for {:.2}% change", protocol.name, result.percentage_change);
            return None;
        }
        Some(self.classify(protocol, &signal, timestamp))
    }

    fn message(severity: Severity, signal: &FlowSignal) -> String {
        let change = signal.percentage_change;
        match (severity, signal.kind) {
            (Severity::Critical, _) => format!(
                "Critical TVL outflow detected ({:.1}%). Potential liquidity crisis.",
                change
            ),
            (Severity::High, _) => format!(
                "Unusual TVL outflow pattern detected. Withdrawal rate {:.1}x higher than prior average.",
                signal.rate_multiple.unwrap_or_default()
            ),
            (Severity::Medium, _) => format!(
                "Increased TVL volatility detected. Current movement exceeds {:.1} standard deviations from 7-day average.",
                signal.deviation_sigma.unwrap_or_default()
            ),
            (Severity::Low, AlertKind::Inflow) => format!("Significant TVL inflow detected (+{:.1}%).", change),
            (Severity::Low, AlertKind::Outflow) => format!("TVL outflow observed ({:.1}%).", change),
            (Severity::Low, AlertKind::Volatility) => format!("TVL movement of {:.1}% within normal volatility.", change),
        }
    }
}
