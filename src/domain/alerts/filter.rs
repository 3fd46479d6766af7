use super::{Alert, AlertKind};
use crate::shared::types::Severity;

/// Alert list filter; `None` fields match everything
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertFilter {
    pub severity: Option<Severity>,
    pub kind: Option<AlertKind>,
    pub unread_only: bool,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.severity.map_or(true, |s| alert.severity() == s)
            && self.kind.map_or(true, |k| alert.kind() == k)
            && (!self.unread_only || !alert.is_read())
    }

    pub fn apply<'a>(&self, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts.iter().filter(|a| self.matches(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alerts::{mark_read, AlertClassifier, FlowSignal};
    use crate::shared::types::ProtocolRecord;

    #[test]
    fn test_filters_combine() {
        let classifier = AlertClassifier::default();
        let protocol = ProtocolRecord::new("0x2", "Maker", 40, 2e9);
        let mut alerts = vec![
            classifier.classify(&protocol, &FlowSignal::new(AlertKind::Outflow, -40.0), 1),
            classifier.classify(&protocol, &FlowSignal::new(AlertKind::Outflow, -3.0), 2),
            classifier.classify(&protocol, &FlowSignal::new(AlertKind::Inflow, 11.0), 3),
        ];
        let first = alerts[0].id().to_string();
        mark_read(&mut alerts, &first);

        assert_eq!(AlertFilter::default().apply(&alerts).len(), 3);

        let outflows = AlertFilter { kind: Some(AlertKind::Outflow), ..Default::default() };
        assert_eq!(outflows.apply(&alerts).len(), 2);

        let unread_outflows = AlertFilter { unread_only: true, ..outflows };
        let hits = unread_outflows.apply(&alerts);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].timestamp(), 2);

        let critical = AlertFilter { severity: Some(Severity::Critical), ..Default::default() };
        assert_eq!(critical.apply(&alerts).len(), 1);
    }
}
