//! Liquidity domain - TVL flow anomalies and historical crisis matching

mod normalizer;
mod outflow_detector;
mod pattern_matcher;
mod historical_events;

pub use normalizer::SeriesNormalizer;
pub use outflow_detector::{OutflowAnomalyDetector, OutflowThresholds};
pub use pattern_matcher::{HistoricalPatternMatcher, MatchingConfig};
pub use historical_events::default_library;

use crate::shared::errors::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

const SECONDS_PER_HOUR: i64 = 3600;

/// TVL observation at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TvlPoint {
    /// Unix seconds
    pub timestamp: i64,
    pub tvl: f64,
}

impl TvlPoint {
    pub fn new(timestamp: i64, tvl: f64) -> Self {
        Self { timestamp, tvl }
    }
}

/// Time-ordered TVL series of one protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawFlowWindow")]
pub struct FlowWindow {
    protocol_id: String,
    points: Vec<TvlPoint>,
}

/// Wire form of `FlowWindow`, checked by `FlowWindow::new` on the way in
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFlowWindow {
    protocol_id: String,
    points: Vec<TvlPoint>,
}

impl TryFrom<RawFlowWindow> for FlowWindow {
    type Error = AnalysisError;

    fn try_from(raw: RawFlowWindow) -> AnalysisResult<Self> {
        Self::new(raw.protocol_id, raw.points)
    }
}

impl FlowWindow {
    /// Build a window, rejecting empty, unordered or negative series
    pub fn new(protocol_id: impl Into<String>, points: Vec<TvlPoint>) -> AnalysisResult<Self> {
        let protocol_id = protocol_id.into();
        if points.is_empty() {
            return Err(AnalysisError::InvalidInput(format!(
                "empty flow window for {}",
                protocol_id
            )));
        }
        if let Some(bad) = points.iter().find(|p| !p.tvl.is_finite() || p.tvl < 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "tvl {} at {} is not a finite non-negative value",
                bad.tvl, bad.timestamp
            )));
        }
        if points.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
            return Err(AnalysisError::InvalidInput(format!(
                "flow window for {} is not ordered by timestamp",
                protocol_id
            )));
        }
        Ok(Self { protocol_id, points })
    }

    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    pub fn points(&self) -> &[TvlPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &TvlPoint {
        &self.points[0]
    }

    pub fn last(&self) -> &TvlPoint {
        &self.points[self.points.len() - 1]
    }

    pub fn tvl_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.tvl)
    }

    /// Keep only the most recent `max_len` points
    pub fn truncate_to(&self, max_len: usize) -> Self {
        let keep = max_len.max(1).min(self.points.len());
        Self {
            protocol_id: self.protocol_id.clone(),
            points: self.points[self.points.len() - keep..].to_vec(),
        }
    }

    /// Points observed within `hours` before `now`
    pub fn within_lookback(&self, now: i64, hours: u32) -> AnalysisResult<Self> {
        let cutoff = now - hours as i64 * SECONDS_PER_HOUR;
        let points = self
            .points
            .iter()
            .filter(|p| p.timestamp >= cutoff)
            .copied()
            .collect();
        Self::new(self.protocol_id.clone(), points)
    }
}

/// Outcome of the outflow check on one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResult {
    pub initial_tvl: f64,
    pub current_tvl: f64,
    pub percentage_change: f64,
    pub hours_diff: f64,
    pub outflow_rate_per_hour: f64,
    pub is_anomaly: bool,
    pub is_severe: bool,
}

/// Kind of historical crisis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Exploit,
    BankRun,
    MarketEvent,
}

/// Reference crisis pattern on the distress scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalEvent {
    pub id: String,
    pub name: String,
    pub date: String,
    pub flow_pattern: Vec<f64>,
    pub impacted_tvl: f64,
    pub percentage_lost: f64,
    pub category: EventCategory,
}

impl HistoricalEvent {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.flow_pattern.is_empty() {
            return Err(AnalysisError::InvalidInput(format!("event {} has an empty flow pattern", self.id)));
        }
        if self.flow_pattern.iter().any(|v| !(0.0..=100.0).contains(v)) {
            return Err(AnalysisError::InvalidInput(format!(
                "event {} flow pattern leaves the 0-100 scale",
                self.id
            )));
        }
        Ok(())
    }
}

/// Similarity of one protocol window to one historical event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityScore {
    pub event_id: String,
    pub event_name: String,
    pub category: EventCategory,
    pub similarity: f64,
}

/// Similarity bands driving the risk banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityBand {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for SimilarityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimilarityBand::Low => "low",
            SimilarityBand::Medium => "medium",
            SimilarityBand::High => "high",
            SimilarityBand::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Textual assessment derived from the closest historical match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBanner {
    pub level: SimilarityBand,
    pub message: String,
    pub recommendation: String,
}

/// Per-protocol flow summary used by the TVL monitor view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetrics {
    pub protocol_id: String,
    pub protocol_name: String,
    pub anomaly: AnomalyResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowSortKey {
    Name,
    Tvl,
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort flow metrics in place; ties keep their input order
pub fn sort_flow_metrics(metrics: &mut [FlowMetrics], key: FlowSortKey, direction: SortDirection) {
    metrics.sort_by(|a, b| {
        let ord = match key {
            FlowSortKey::Name => a.protocol_name.cmp(&b.protocol_name),
            FlowSortKey::Tvl => a.anomaly.current_tvl.total_cmp(&b.anomaly.current_tvl),
            FlowSortKey::Change => a.anomaly.percentage_change.total_cmp(&b.anomaly.percentage_change),
        };
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

/// Descending by similarity, then ascending by event id
pub(crate) fn compare_similarity(a: &SimilarityScore, b: &SimilarityScore) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.event_id.cmp(&b.event_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[(i64, f64)]) -> Vec<TvlPoint> {
        values.iter().map(|&(t, v)| TvlPoint::new(t, v)).collect()
    }

    #[test]
    fn test_flow_window_rejects_bad_input() {
        assert!(matches!(FlowWindow::new("p", vec![]), Err(AnalysisError::InvalidInput(_))));
        assert!(FlowWindow::new("p", points(&[(10, 1.0), (5, 2.0)])).is_err());
        assert!(FlowWindow::new("p", points(&[(10, -1.0)])).is_err());
        assert!(FlowWindow::new("p", points(&[(10, f64::NAN)])).is_err());
        assert!(FlowWindow::new("p", points(&[(10, 1.0), (10, 2.0)])).is_ok());
    }

    #[test]
    fn test_deserialized_window_is_validated() {
        let empty = serde_json::from_str::<FlowWindow>(r#"{"protocolId":"x","points":[]}"#);
        assert!(empty.unwrap_err().to_string().contains("empty flow window"));

        let unordered = r#"{"protocolId":"x","points":[{"timestamp":10,"tvl":1.0},{"timestamp":5,"tvl":2.0}]}"#;
        assert!(serde_json::from_str::<FlowWindow>(unordered).is_err());

        let window = FlowWindow::new("x", points(&[(0, 100.0), (3600, 90.0)])).unwrap();
        let json = serde_json::to_string(&window).unwrap();
        assert_eq!(serde_json::from_str::<FlowWindow>(&json).unwrap(), window);
    }

    #[test]
    fn test_truncate_and_lookback() {
        let series: Vec<(i64, f64)> = (0..30).map(|i| (i * 3600, 1000.0 - i as f64)).collect();
        let window = FlowWindow::new("p", points(&series)).unwrap();

        let recent = window.truncate_to(20);
        assert_eq!(recent.len(), 20);
        assert_eq!(recent.first().timestamp, 10 * 3600);
        assert_eq!(recent.last().timestamp, 29 * 3600);

        let now = 29 * 3600;
        let last_six = window.within_lookback(now, 6).unwrap();
        assert_eq!(last_six.len(), 7);
        assert!(window.within_lookback(now + 100 * 3600, 6).is_err());
    }

    #[test]
    fn test_sort_flow_metrics() {
        let metric = |name: &str, tvl: f64, change: f64| FlowMetrics {
            protocol_id: name.to_lowercase(),
            protocol_name: name.to_string(),
            anomaly: AnomalyResult {
                initial_tvl: tvl,
                current_tvl: tvl,
                percentage_change: change,
                hours_diff: 1.0,
                outflow_rate_per_hour: 0.0,
                is_anomaly: false,
                is_severe: false,
            },
        };
        let mut metrics = vec![metric("Curve", 50.0, -3.0), metric("Aave", 10.0, -20.0), metric("Lido", 90.0, 4.0)];

        sort_flow_metrics(&mut metrics, FlowSortKey::Change, SortDirection::Asc);
        assert_eq!(metrics[0].protocol_name, "Aave");

        sort_flow_metrics(&mut metrics, FlowSortKey::Tvl, SortDirection::Desc);
        assert_eq!(metrics[0].protocol_name, "Lido");

        sort_flow_metrics(&mut metrics, FlowSortKey::Name, SortDirection::Asc);
        let names: Vec<_> = metrics.iter().map(|m| m.protocol_name.as_str()).collect();
        assert_eq!(names, vec!["Aave", "Curve", "Lido"]);
    }
}
