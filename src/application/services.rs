//! Application services and use cases

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::alerts::{self, Alert, AlertClassifier};
use crate::domain::liquidity::{
    default_library, sort_flow_metrics, AnomalyResult, FlowMetrics, FlowSortKey, FlowWindow,
    HistoricalEvent, HistoricalPatternMatcher, OutflowAnomalyDetector, RiskBanner, SimilarityScore,
    SortDirection,
};
use crate::domain::portfolio::{PortfolioAssessment, PortfolioRiskAggregator};
use crate::domain::scoring::{
    AggregateScore, HealthBand, HealthScorer, MultiFactorScorer, RiskComponentScorer, TrustAssessment,
    TrustScorer,
};
use crate::infrastructure::MarketSnapshot;
use crate::shared::errors::{AnalysisResult, AppError};
use crate::shared::types::{ExposureRecord, FlowBaseline, ProtocolRecord, ReputationRecord};

/// Inputs of one protocol analysis
#[derive(Debug, Clone)]
pub struct ProtocolInput {
    pub protocol: ProtocolRecord,
    pub history: Option<FlowWindow>,
    pub baseline: Option<FlowBaseline>,
    pub reputation: Option<ReputationRecord>,
}

impl ProtocolInput {
    pub fn new(protocol: ProtocolRecord) -> Self {
        Self {
            protocol,
            history: None,
            baseline: None,
            reputation: None,
        }
    }
}

/// Everything the service derives for one protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolAnalysis {
    pub protocol: ProtocolRecord,
    /// Absent when the protocol has no TVL history in the lookback
    pub anomaly: Option<AnomalyResult>,
    pub similarities: Vec<SimilarityScore>,
    pub banner: Option<RiskBanner>,
    pub health: AggregateScore,
    pub health_band: HealthBand,
    pub trust: Option<TrustAssessment>,
    pub risk_components: AggregateScore,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedProtocol {
    pub address: String,
    pub reason: String,
}

/// Result of one pass over a market snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringReport {
    pub evaluated_at: i64,
    pub analyses: Vec<ProtocolAnalysis>,
    /// Worst percentage change first
    pub flows: Vec<FlowMetrics>,
    /// Newest first
    pub alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<PortfolioAssessment>,
    pub skipped: Vec<SkippedProtocol>,
}

/// Composes the detectors and scorers configured by `Config`
pub struct SentinelService {
    detector: OutflowAnomalyDetector,
    lookback_hours: u32,
    matcher: HistoricalPatternMatcher,
    library: Vec<HistoricalEvent>,
    health: HealthScorer,
    trust: TrustScorer,
    risk_components: RiskComponentScorer,
    classifier: AlertClassifier,
    aggregator: PortfolioRiskAggregator,
    jitter_seed: Option<u64>,
}

impl SentinelService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            detector: OutflowAnomalyDetector::new(config.detection),
            lookback_hours: config.polling.lookback_hours,
            matcher: HistoricalPatternMatcher::new(config.matching),
            library: default_library(),
            health: HealthScorer::new(config.scoring.health),
            trust: TrustScorer::new(config.scoring.trust),
            risk_components: RiskComponentScorer::new(config.scoring.risk_components),
            classifier: AlertClassifier::new(config.alerts),
            aggregator: PortfolioRiskAggregator::new(config.portfolio),
            jitter_seed: config.data.health_jitter.then_some(config.data.demo_seed),
        })
    }

    /// Replace the built-in crisis library
    pub fn with_library(mut self, library: Vec<HistoricalEvent>) -> Self {
        self.library = library;
        self
    }

    pub fn library(&self) -> &[HistoricalEvent] {
        &self.library
    }

    /// Analyze one protocol as of `now` (unix seconds)
    pub fn analyze_protocol(&self, input: ProtocolInput, now: i64) -> AnalysisResult<ProtocolAnalysis> {
        let ProtocolInput {
            protocol,
            history,
            baseline,
            reputation,
        } = input;

        let window = history.and_then(|w| self.recent_window(&w, now));

        let (anomaly, similarities) = match &window {
            Some(w) => (Some(self.detector.detect(w)), self.matcher.rank(w, &self.library)?),
            None => (None, Vec::new()),
        };
        let banner = self.matcher.assess(&similarities);

        let (health, health_band) = match self.jitter_seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed ^ address_hash(&protocol.address));
                let aggregate = MultiFactorScorer::score(&self.health.derive_metrics_with_jitter(&protocol, &mut rng))?;
                let band = HealthBand::from_score(aggregate.value);
                (aggregate, band)
            }
            None => self.health.score(&protocol)?,
        };

        let trust = reputation.as_ref().map(|r| self.trust.assess(r)).transpose()?;
        let risk_components = self.risk_components.assess(&protocol, now)?;

        let alerts: Vec<Alert> = anomaly
            .as_ref()
            .and_then(|a| self.classifier.classify_anomaly(&protocol, a, baseline.as_ref(), now))
            .into_iter()
            .collect();

        debug!(
            "{}: health {} ({}), {} alerts",
            protocol.name,
            health.value,
            health_band,
            alerts.len()
        );

        Ok(ProtocolAnalysis {
            protocol,
            anomaly,
            similarities,
            banner,
            health,
            health_band,
            trust,
            risk_components,
            alerts,
        })
    }

    pub fn assess_portfolio(&self, holdings: &[ExposureRecord], protocols: &[ProtocolRecord]) -> PortfolioAssessment {
        self.aggregator.assess_holdings(holdings, protocols)
    }

    /// Analyze every protocol of the snapshot. Protocols whose data fails
    /// validation are reported as skipped instead of failing the pass.
    pub fn run_pass(&self, snapshot: &MarketSnapshot, user: Option<&str>, now: i64) -> MonitoringReport {
        let evaluated_at = snapshot.taken_at.unwrap_or(now);
        let mut analyses = Vec::with_capacity(snapshot.protocols.len());
        let mut skipped = Vec::new();

        for protocol in &snapshot.protocols {
            let analysis = self
                .input_from_snapshot(snapshot, protocol)
                .and_then(|input| self.analyze_protocol(input, evaluated_at));
            match analysis {
                Ok(analysis) => analyses.push(analysis),
                Err(e) => {
                    warn!("Skipping {}: {}", protocol.name, e);
                    skipped.push(SkippedProtocol {
                        address: protocol.address.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut flows: Vec<FlowMetrics> = analyses
            .iter()
            .filter_map(|a| {
                a.anomaly.map(|anomaly| FlowMetrics {
                    protocol_id: a.protocol.address.clone(),
                    protocol_name: a.protocol.name.clone(),
                    anomaly,
                })
            })
            .collect();
        sort_flow_metrics(&mut flows, FlowSortKey::Change, SortDirection::Asc);

        let mut alerts: Vec<Alert> = analyses.iter().flat_map(|a| a.alerts.iter().cloned()).collect();
        alerts::sort_newest_first(&mut alerts);

        let portfolio = user.and_then(|u| {
            let holdings = snapshot.user_exposures(u)?;
            Some(self.assess_portfolio(holdings, &snapshot.protocols))
        });

        info!(
            "📊 Pass complete: {} analyzed, {} skipped, {} alerts ({} unread)",
            analyses.len(),
            skipped.len(),
            alerts.len(),
            alerts::unread_count(&alerts)
        );

        MonitoringReport {
            evaluated_at,
            analyses,
            flows,
            alerts,
            portfolio,
            skipped,
        }
    }

    fn input_from_snapshot(&self, snapshot: &MarketSnapshot, protocol: &ProtocolRecord) -> AnalysisResult<ProtocolInput> {
        let history = snapshot
            .history(&protocol.address)
            .filter(|points| !points.is_empty())
            .map(|points| FlowWindow::new(protocol.address.clone(), points.to_vec()))
            .transpose()?;
        Ok(ProtocolInput {
            protocol: protocol.clone(),
            history,
            baseline: snapshot.baseline(&protocol.address).copied(),
            reputation: snapshot.reputation(&protocol.address).cloned(),
        })
    }

    fn recent_window(&self, window: &FlowWindow, now: i64) -> Option<FlowWindow> {
        if self.lookback_hours == 0 {
            return Some(window.clone());
        }
        match window.within_lookback(now, self.lookback_hours) {
            Ok(recent) => Some(recent),
            Err(_) => {
                debug!("{}: no points within {}h", window.protocol_id(), self.lookback_hours);
                None
            }
        }
    }
}

/// FNV-1a over the address, mixing per-protocol variety into the jitter seed
fn address_hash(address: &str) -> u64 {
    address
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325, |hash, b| (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alerts::AlertKind;
    use crate::domain::liquidity::TvlPoint;
    use crate::domain::portfolio::RecommendationType;
    use crate::infrastructure::DemoDataSource;
    use crate::shared::types::Severity;

    const NOW: i64 = 1_700_000_000;

    fn declining_window(address: &str, from: f64, to: f64) -> FlowWindow {
        let points = (0..20)
            .map(|i| {
                let t = i as f64 / 19.0;
                TvlPoint::new(NOW - (19 - i) * 3600, from + (to - from) * t)
            })
            .collect();
        FlowWindow::new(address, points).unwrap()
    }

    fn service() -> SentinelService {
        SentinelService::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_declining_protocol_raises_critical_alert() {
        let protocol = ProtocolRecord::new("0xdead", "Collapse", 80, 300.0);
        let mut input = ProtocolInput::new(protocol);
        input.history = Some(declining_window("0xdead", 1000.0, 300.0));

        let analysis = service().analyze_protocol(input, NOW).unwrap();
        let anomaly = analysis.anomaly.unwrap();
        assert!((anomaly.percentage_change + 70.0).abs() < 1e-9);
        assert!(anomaly.is_anomaly);
        assert_eq!(analysis.similarities.len(), 5);
        assert!(analysis.banner.is_some());
        assert_eq!(analysis.alerts.len(), 1);
        assert_eq!(analysis.alerts[0].severity(), Severity::Critical);
        assert_eq!(analysis.alerts[0].kind(), AlertKind::Outflow);
        assert_eq!(analysis.alerts[0].timestamp(), NOW);
    }

    #[test]
    fn test_protocol_without_history() {
        let protocol = ProtocolRecord::new("0xnew", "Fresh", 40, 2e7);
        let analysis = service().analyze_protocol(ProtocolInput::new(protocol), NOW).unwrap();
        assert!(analysis.anomaly.is_none());
        assert!(analysis.similarities.is_empty());
        assert!(analysis.banner.is_none());
        assert!(analysis.alerts.is_empty());
        assert!(analysis.trust.is_none());
        // base 60, liquidity +15: 60 + 0.2*15 = 63
        assert_eq!(analysis.health.value, 63.0);
    }

    #[test]
    fn test_detection_covers_whole_lookback() {
        // 25 hourly points: 1000 -> 800 over the first 5h, flat afterwards
        let points = (0..25)
            .map(|i| TvlPoint::new(NOW - (24 - i) * 3600, 1000.0 - 40.0 * i.min(5) as f64))
            .collect();
        let mut input = ProtocolInput::new(ProtocolRecord::new("0xearly", "Early Drop", 50, 800.0));
        input.history = Some(FlowWindow::new("0xearly", points).unwrap());

        let analysis = service().analyze_protocol(input, NOW).unwrap();
        let anomaly = analysis.anomaly.unwrap();
        assert_eq!(anomaly.initial_tvl, 1000.0);
        assert!((anomaly.percentage_change + 20.0).abs() < 1e-9);
        assert_eq!(anomaly.hours_diff, 24.0);
    }

    #[test]
    fn test_history_outside_lookback_is_ignored() {
        let protocol = ProtocolRecord::new("0xold", "Stale", 40, 2e7);
        let mut input = ProtocolInput::new(protocol);
        input.history = Some(declining_window("0xold", 1000.0, 300.0));
        let analysis = service().analyze_protocol(input, NOW + 72 * 3600).unwrap();
        assert!(analysis.anomaly.is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.scoring.health.security = 0.9;
        assert!(matches!(SentinelService::new(&config), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_health_jitter_is_seeded() {
        let mut config = Config::default();
        config.data.health_jitter = true;
        let protocol = ProtocolRecord::new("0xabc", "Jitter", 30, 5e7);
        let a = SentinelService::new(&config).unwrap().analyze_protocol(ProtocolInput::new(protocol.clone()), NOW).unwrap();
        let b = SentinelService::new(&config).unwrap().analyze_protocol(ProtocolInput::new(protocol), NOW).unwrap();
        assert_eq!(a.health, b.health);
    }

    #[test]
    fn test_run_pass_over_demo_market() {
        let demo = DemoDataSource::new(11, NOW);
        let report = service().run_pass(demo.market(), Some(crate::infrastructure::demo_source::DEMO_USER), 0);

        assert_eq!(report.evaluated_at, NOW);
        assert_eq!(report.analyses.len(), 5);
        assert!(report.skipped.is_empty());
        assert_eq!(report.flows.len(), 5);
        assert_eq!(report.flows[0].protocol_name, "Nimbus Bridge");
        assert!(report.alerts.iter().any(|a| a.protocol_name() == "Nimbus Bridge" && a.severity() == Severity::Critical));

        let portfolio = report.portfolio.unwrap();
        assert_eq!(portfolio.exposures.len(), 3);
        assert!(portfolio
            .recommendations
            .iter()
            .any(|r| r.kind == RecommendationType::Exit && r.protocol_id.as_deref() == Some("0x4f0a2b0c9d8e7f6a5b4c3d2e1f0a9b8c7d6e5f41")));
    }

    #[test]
    fn test_run_pass_is_repeatable() {
        let demo = DemoDataSource::new(13, NOW);
        let service = service();
        let user = Some(crate::infrastructure::demo_source::DEMO_USER);
        let first = service.run_pass(demo.market(), user, NOW);
        let second = service.run_pass(demo.market(), user, NOW);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_unordered_history_is_skipped() {
        let mut snapshot = MarketSnapshot::default();
        snapshot.protocols.push(ProtocolRecord::new("0xbad", "Broken", 50, 1e6));
        snapshot
            .histories
            .insert("0xbad".into(), vec![TvlPoint::new(NOW, 10.0), TvlPoint::new(NOW - 3600, 20.0)]);
        let report = service().run_pass(&snapshot, None, NOW);
        assert!(report.analyses.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.portfolio.is_none());
    }
}
