//! Common types used across the application

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol record as supplied by the data collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolRecord {
    pub address: String,
    pub name: String,
    pub risk_score: u8,
    pub tvl: f64,
    #[serde(default)]
    pub anomaly_count: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Unix seconds of deployment, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Observed volatility as a fraction (0.35 = 35%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_risk: Option<u8>,
}

fn default_active() -> bool {
    true
}

impl ProtocolRecord {
    pub fn new(address: impl Into<String>, name: impl Into<String>, risk_score: u8, tvl: f64) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            risk_score: risk_score.min(100),
            tvl,
            anomaly_count: 0,
            is_active: true,
            created_at: None,
            volatility: None,
            audit_risk: None,
        }
    }

    pub fn with_anomaly_count(mut self, anomaly_count: u32) -> Self {
        self.anomaly_count = anomaly_count;
        self
    }
}

/// A user's holding in one protocol, before the portfolio join
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureRecord {
    pub protocol_address: String,
    pub amount: f64,
}

/// Historical flow statistics for a protocol (7-day baseline)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowBaseline {
    /// Average hourly outflow in TVL units
    pub avg_hourly_outflow: f64,
    /// Average percentage change over comparable windows
    pub avg_change_pct: f64,
    /// Standard deviation of the percentage change
    pub std_dev_change_pct: f64,
}

/// Single audit entry of a reputation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub auditor: String,
    /// Unix milliseconds
    pub date: i64,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub verified: bool,
}

/// Reputation inputs supplied by audit and feedback collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationRecord {
    pub transparency_score: f64,
    pub developer_score: f64,
    pub community_score: f64,
    pub incident_response_score: f64,
    #[serde(default)]
    pub audit_history: Vec<AuditRecord>,
}

/// Severity shared by alerts and recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
