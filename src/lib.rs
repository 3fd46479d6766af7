//! DeFi Sentinel - liquidity anomaly detection and protocol risk scoring
//! Built with Domain-Driven Design principles

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod math;
pub mod report;
pub mod shared;

// Re-export main types for convenience
pub use application::{SentinelMonitor, SentinelService};
pub use config::Config;
pub use domain::liquidity::{HistoricalPatternMatcher, OutflowAnomalyDetector, SeriesNormalizer};
pub use domain::portfolio::PortfolioRiskAggregator;
pub use domain::scoring::MultiFactorScorer;
pub use report::ProtocolReport;
