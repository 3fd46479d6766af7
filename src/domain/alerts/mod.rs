//! Alerts domain - liquidity alerts, read state and filtering

mod classifier;
mod filter;

pub use classifier::{AlertClassifier, AlertPolicy, FlowSignal};
pub use filter::AlertFilter;

use crate::shared::types::Severity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Outflow,
    Inflow,
    Volatility,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Outflow => "outflow",
            AlertKind::Inflow => "inflow",
            AlertKind::Volatility => "volatility",
        }
    }
}

/// Liquidity alert. Only `is_read` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    id: String,
    protocol_name: String,
    protocol_address: String,
    severity: Severity,
    #[serde(rename = "type")]
    kind: AlertKind,
    timestamp: i64,
    message: String,
    percentage_change: f64,
    is_read: bool,
}

impl Alert {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    pub fn protocol_address(&self) -> &str {
        &self.protocol_address
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn percentage_change(&self) -> f64 {
        self.percentage_change
    }

    pub fn is_read(&self) -> bool {
        self.is_read
    }

    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}

/// Acknowledge the alert with the given id; returns whether it was found
pub fn mark_read(alerts: &mut [Alert], id: &str) -> bool {
    match alerts.iter_mut().find(|a| a.id == id) {
        Some(alert) => {
            alert.mark_read();
            true
        }
        None => false,
    }
}

pub fn mark_all_read(alerts: &mut [Alert]) {
    alerts.iter_mut().for_each(Alert::mark_read);
}

pub fn unread_count(alerts: &[Alert]) -> usize {
    alerts.iter().filter(|a| !a.is_read).count()
}

/// Newest first; equal timestamps put the more severe alert first
pub fn sort_newest_first(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.severity.cmp(&a.severity))
    });
}
