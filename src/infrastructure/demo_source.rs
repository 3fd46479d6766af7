//! Seeded synthetic market for demos and local runs

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::data_source::{MarketDataSource, MarketSnapshot};
use crate::domain::liquidity::TvlPoint;
use crate::shared::errors::DataSourceError;
use crate::shared::types::{AuditRecord, ExposureRecord, FlowBaseline, ProtocolRecord, ReputationRecord};

pub const DEMO_USER: &str = "demo";

const HISTORY_POINTS: usize = 20;
const SECONDS_PER_HOUR: i64 = 3600;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy)]
enum Trend {
    Stable,
    Drift,
    Collapse,
    Inflow,
}

impl Trend {
    /// Share of the starting TVL left at fraction `t` of the window
    fn factor(self, t: f64) -> f64 {
        match self {
            Trend::Stable => 1.0,
            Trend::Drift => 1.0 - 0.07 * t,
            Trend::Collapse => 1.0 - 0.6 * t * t,
            Trend::Inflow => 1.0 + 0.12 * t,
        }
    }
}

struct DemoProtocol {
    address: &'static str,
    name: &'static str,
    risk_score: u8,
    start_tvl: f64,
    trend: Trend,
    anomaly_count: u32,
    age_days: i64,
    holding: Option<f64>,
}

const PROTOCOLS: [DemoProtocol; 5] = [
    DemoProtocol {
        address: "0x7d2768de32b0b80b7a3454c06bdac94a69ddc7a9",
        name: "Aave V2",
        risk_score: 22,
        start_tvl: 5.2e9,
        trend: Trend::Stable,
        anomaly_count: 0,
        age_days: 1200,
        holding: Some(12_000.0),
    },
    DemoProtocol {
        address: "0x3d9819210a31b4961b30ef54be2aed79b9c9cd3b",
        name: "Compound",
        risk_score: 35,
        start_tvl: 2.1e9,
        trend: Trend::Stable,
        anomaly_count: 0,
        age_days: 1500,
        holding: None,
    },
    DemoProtocol {
        address: "0xbebc44782c7db0a1a60cb6fe97d0b483032ff1c7",
        name: "Curve 3pool",
        risk_score: 48,
        start_tvl: 3.4e9,
        trend: Trend::Drift,
        anomaly_count: 1,
        age_days: 1100,
        holding: Some(4_000.0),
    },
    DemoProtocol {
        address: "0x4f0a2b0c9d8e7f6a5b4c3d2e1f0a9b8c7d6e5f41",
        name: "Nimbus Bridge",
        risk_score: 82,
        start_tvl: 8.5e7,
        trend: Trend::Collapse,
        anomaly_count: 3,
        age_days: 45,
        holding: Some(9_000.0),
    },
    DemoProtocol {
        address: "0xae7ab96520de3a18e5e111b5eaab095312d7fe84",
        name: "Lido",
        risk_score: 18,
        start_tvl: 1.4e10,
        trend: Trend::Inflow,
        anomaly_count: 0,
        age_days: 900,
        holding: None,
    },
];

/// Deterministic market: the same seed and anchor always produce the same data
#[derive(Debug, Clone)]
pub struct DemoDataSource {
    snapshot: MarketSnapshot,
}

impl DemoDataSource {
    /// `anchor` is the unix time of the most recent history point
    pub fn new(seed: u64, anchor: i64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut snapshot = MarketSnapshot {
            taken_at: Some(anchor),
            ..MarketSnapshot::default()
        };
        let mut holdings = Vec::new();

        for demo in &PROTOCOLS {
            let history: Vec<TvlPoint> = (0..HISTORY_POINTS)
                .map(|i| {
                    let t = i as f64 / (HISTORY_POINTS - 1) as f64;
                    let noise = 1.0 + rng.gen_range(-0.004..0.004);
                    let timestamp = anchor - (HISTORY_POINTS - 1 - i) as i64 * SECONDS_PER_HOUR;
                    TvlPoint::new(timestamp, (demo.start_tvl * demo.trend.factor(t) * noise).round())
                })
                .collect();
            let current_tvl = history.last().map_or(demo.start_tvl, |p| p.tvl);

            let mut protocol = ProtocolRecord::new(demo.address, demo.name, demo.risk_score, current_tvl)
                .with_anomaly_count(demo.anomaly_count);
            protocol.created_at = Some(anchor - demo.age_days * SECONDS_PER_DAY);
            protocol.volatility = Some((rng.gen_range(0.05..0.6_f64) * 100.0).round() / 100.0);
            protocol.audit_risk = Some(demo.risk_score.saturating_sub(rng.gen_range(0..10)));

            let baseline = FlowBaseline {
                avg_hourly_outflow: (demo.start_tvl * 0.001).round(),
                avg_change_pct: -0.2,
                std_dev_change_pct: 1.5,
            };

            let trust_base = 100.0 - demo.risk_score as f64;
            let mut jittered = |spread: f64| (trust_base + rng.gen_range(-spread..spread)).clamp(0.0, 100.0).round();
            let reputation = ReputationRecord {
                transparency_score: jittered(10.0),
                developer_score: jittered(10.0),
                community_score: jittered(15.0),
                incident_response_score: jittered(20.0),
                audit_history: vec![AuditRecord {
                    auditor: "Trail of Bits".to_string(),
                    date: (anchor - 200 * SECONDS_PER_DAY) * 1000,
                    score: Some(jittered(5.0)),
                    verified: demo.risk_score < 50,
                }],
            };

            if let Some(amount) = demo.holding {
                holdings.push(ExposureRecord {
                    protocol_address: demo.address.to_string(),
                    amount,
                });
            }

            snapshot.histories.insert(demo.address.to_string(), history);
            snapshot.baselines.insert(demo.address.to_string(), baseline);
            snapshot.reputations.insert(demo.address.to_string(), reputation);
            snapshot.protocols.push(protocol);
        }

        snapshot.exposures.insert(DEMO_USER.to_string(), holdings);
        Self { snapshot }
    }

    pub fn market(&self) -> &MarketSnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl MarketDataSource for DemoDataSource {
    fn name(&self) -> &str {
        "demo"
    }

    async fn protocols(&self) -> Result<Vec<ProtocolRecord>, DataSourceError> {
        Ok(self.snapshot.protocols.clone())
    }

    async fn tvl_history(&self, address: &str) -> Result<Vec<TvlPoint>, DataSourceError> {
        self.snapshot
            .history(address)
            .map(<[TvlPoint]>::to_vec)
            .ok_or_else(|| DataSourceError::ProtocolNotFound(address.to_string()))
    }

    async fn flow_baseline(&self, address: &str) -> Result<Option<FlowBaseline>, DataSourceError> {
        Ok(self.snapshot.baseline(address).copied())
    }

    async fn reputation(&self, address: &str) -> Result<Option<ReputationRecord>, DataSourceError> {
        Ok(self.snapshot.reputation(address).cloned())
    }

    async fn user_exposures(&self, user: &str) -> Result<Vec<ExposureRecord>, DataSourceError> {
        Ok(self
            .snapshot
            .user_exposures(user)
            .map(<[ExposureRecord]>::to_vec)
            .unwrap_or_default())
    }

    /// The whole market as of the anchor, so passes evaluate at `taken_at`
    async fn snapshot(&self, user: Option<&str>) -> Result<MarketSnapshot, DataSourceError> {
        let mut snapshot = self.snapshot.clone();
        match user {
            Some(user) => snapshot.exposures.retain(|k, _| k.eq_ignore_ascii_case(user)),
            None => snapshot.exposures.clear(),
        }
        Ok(snapshot)
    }
}
