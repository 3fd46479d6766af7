//! Polling monitor: one snapshot and one analysis pass per tick

use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::scheduler::{IntervalTask, ScheduleHandle, Scheduler};
use super::services::{MonitoringReport, SentinelService};
use crate::domain::alerts::{self, Alert, AlertFilter};
use crate::infrastructure::MarketDataSource;
use crate::shared::errors::{AppError, ReportError};

/// Alerts kept in the inbox across passes
const MAX_INBOX: usize = 500;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    /// User whose portfolio is assessed on each pass
    pub user: Option<String>,
    /// Latest pass is written here as JSON when set
    pub output: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            user: None,
            output: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorStats {
    pub start_time: Instant,
    pub passes: u64,
    pub failed_passes: u64,
    pub protocols_analyzed: u64,
    pub alerts_raised: u64,
    pub last_update: Instant,
}

impl MonitorStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            passes: 0,
            failed_passes: 0,
            protocols_analyzed: 0,
            alerts_raised: 0,
            last_update: Instant::now(),
        }
    }

    pub fn get_uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn get_alerts_per_minute(&self) -> f64 {
        let uptime_minutes = self.get_uptime().as_secs_f64() / 60.0;
        if uptime_minutes > 0.0 {
            self.alerts_raised as f64 / uptime_minutes
        } else {
            0.0
        }
    }
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct SentinelMonitor {
    config: MonitorConfig,
    service: Arc<SentinelService>,
    source: Arc<dyn MarketDataSource>,
    stats: Arc<RwLock<MonitorStats>>,
    inbox: Arc<RwLock<Vec<Alert>>>,
    /// Ids already raised, including alerts since dropped from the inbox
    seen: Arc<RwLock<HashSet<String>>>,
    latest: Arc<RwLock<Option<MonitoringReport>>>,
}

impl SentinelMonitor {
    pub fn new(config: MonitorConfig, service: Arc<SentinelService>, source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            config,
            service,
            source,
            stats: Arc::new(RwLock::new(MonitorStats::new())),
            inbox: Arc::new(RwLock::new(Vec::new())),
            seen: Arc::new(RwLock::new(HashSet::new())),
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Fetch one snapshot and analyze it
    pub async fn tick(&self) -> Result<MonitoringReport, AppError> {
        let snapshot = match self.source.snapshot(self.config.user.as_deref()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.stats.write().await.failed_passes += 1;
                return Err(e.into());
            }
        };

        let report = self
            .service
            .run_pass(&snapshot, self.config.user.as_deref(), Utc::now().timestamp());
        let fresh = self.merge_alerts(&report.alerts).await;

        {
            let mut stats = self.stats.write().await;
            stats.passes += 1;
            stats.protocols_analyzed += report.analyses.len() as u64;
            stats.alerts_raised += fresh.len() as u64;
            stats.last_update = Instant::now();
        }

        for alert in &fresh {
            warn!("🚨 [{}] {}: {}", alert.severity(), alert.protocol_name(), alert.message());
        }

        if let Some(path) = &self.config.output {
            let json = serde_json::to_string_pretty(&report).map_err(ReportError::from)?;
            tokio::fs::write(path, json).await?;
        }

        *self.latest.write().await = Some(report.clone());
        Ok(report)
    }

    /// Add alerts not seen before, keeping read state of known ones.
    /// Returns the new alerts.
    async fn merge_alerts(&self, incoming: &[Alert]) -> Vec<Alert> {
        let mut seen = self.seen.write().await;
        let fresh: Vec<Alert> = incoming
            .iter()
            .filter(|a| seen.insert(a.id().to_string()))
            .cloned()
            .collect();
        let mut inbox = self.inbox.write().await;
        inbox.extend(fresh.iter().cloned());
        alerts::sort_newest_first(&mut inbox);
        inbox.truncate(MAX_INBOX);
        fresh
    }

    pub fn start(&self, scheduler: &dyn Scheduler) -> ScheduleHandle {
        info!(
            "🚀 Monitoring {} every {:?}",
            self.source.name(),
            self.config.interval
        );
        let monitor = self.clone();
        let task: IntervalTask = Box::new(move || {
            let monitor = monitor.clone();
            Box::pin(async move {
                if let Err(e) = monitor.tick().await {
                    error!("❌ Monitoring pass failed: {}", e);
                }
            })
        });
        scheduler.on_interval(self.config.interval, task)
    }

    /// Monitor until `duration` elapses, or until Ctrl-C when unset
    pub async fn run_for(&self, scheduler: &dyn Scheduler, duration: Option<Duration>) -> Result<MonitorStats, AppError> {
        let handle = self.start(scheduler);
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => {
                tokio::signal::ctrl_c()
                    .await
                    .map_err(|e| AppError::Scheduler(format!("Ctrl-C handler: {}", e)))?;
            }
        }
        handle.cancel();
        handle.join().await?;
        self.print_monitor_stats().await;
        Ok(self.stats().await)
    }

    pub async fn stats(&self) -> MonitorStats {
        self.stats.read().await.clone()
    }

    pub async fn latest(&self) -> Option<MonitoringReport> {
        self.latest.read().await.clone()
    }

    pub async fn inbox(&self) -> Vec<Alert> {
        self.inbox.read().await.clone()
    }

    pub async fn filtered_inbox(&self, filter: &AlertFilter) -> Vec<Alert> {
        filter.apply(&self.inbox.read().await).into_iter().cloned().collect()
    }

    pub async fn mark_read(&self, id: &str) -> bool {
        alerts::mark_read(&mut self.inbox.write().await, id)
    }

    pub async fn mark_all_read(&self) {
        alerts::mark_all_read(&mut self.inbox.write().await);
    }

    pub async fn unread_count(&self) -> usize {
        alerts::unread_count(&self.inbox.read().await)
    }

    async fn print_monitor_stats(&self) {
        let stats = self.stats.read().await;
        info!("📊 Monitoring statistics:");
        info!("   Uptime: {:.1} min", stats.get_uptime().as_secs_f64() / 60.0);
        info!("   Passes: {} ({} failed)", stats.passes, stats.failed_passes);
        info!("   Protocols analyzed: {}", stats.protocols_analyzed);
        if stats.alerts_raised > 0 {
            info!("   Alerts raised: {} ({:.1}/min)", stats.alerts_raised, stats.get_alerts_per_minute());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scheduler::TokioScheduler;
    use crate::config::Config;
    use crate::infrastructure::demo_source::{DemoDataSource, DEMO_USER};
    use crate::domain::liquidity::TvlPoint;
    use crate::infrastructure::{MarketSnapshot, SnapshotFileSource};
    use crate::shared::errors::DataSourceError;
    use crate::shared::types::{ExposureRecord, FlowBaseline, ProtocolRecord, ReputationRecord, Severity};
    use async_trait::async_trait;

    fn monitor(source: Arc<dyn MarketDataSource>, config: MonitorConfig) -> SentinelMonitor {
        let service = Arc::new(SentinelService::new(&Config::default()).unwrap());
        SentinelMonitor::new(config, service, source)
    }

    #[tokio::test]
    async fn test_tick_fills_inbox_once_per_alert() {
        let source = Arc::new(DemoDataSource::new(5, 1_700_000_000));
        let config = MonitorConfig { user: Some(DEMO_USER.to_string()), ..MonitorConfig::default() };
        let monitor = monitor(source, config);

        let first = monitor.tick().await.unwrap();
        assert!(first.portfolio.is_some());
        let raised = monitor.stats().await.alerts_raised;
        assert!(raised > 0);
        assert_eq!(monitor.unread_count().await, raised as usize);

        // the demo market is fixed, so the second pass repeats the same alerts
        monitor.tick().await.unwrap();
        let stats = monitor.stats().await;
        assert_eq!(stats.passes, 2);
        assert_eq!(stats.alerts_raised, raised);

        let id = monitor.inbox().await[0].id().to_string();
        assert!(monitor.mark_read(&id).await);
        assert_eq!(monitor.unread_count().await, raised as usize - 1);
        let unread = AlertFilter { unread_only: true, ..AlertFilter::default() };
        assert!(monitor.filtered_inbox(&unread).await.iter().all(|a| a.id() != id));
        monitor.mark_all_read().await;
        assert_eq!(monitor.unread_count().await, 0);
        assert!(monitor.latest().await.is_some());
    }

    /// Live feed: no snapshot time, so every pass evaluates at the wall clock
    struct LiveSource {
        market: MarketSnapshot,
    }

    #[async_trait]
    impl MarketDataSource for LiveSource {
        fn name(&self) -> &str {
            "live"
        }

        async fn protocols(&self) -> Result<Vec<ProtocolRecord>, DataSourceError> {
            Ok(self.market.protocols.clone())
        }

        async fn tvl_history(&self, address: &str) -> Result<Vec<TvlPoint>, DataSourceError> {
            Ok(self.market.history(address).map(<[TvlPoint]>::to_vec).unwrap_or_default())
        }

        async fn flow_baseline(&self, address: &str) -> Result<Option<FlowBaseline>, DataSourceError> {
            Ok(self.market.baseline(address).copied())
        }

        async fn reputation(&self, address: &str) -> Result<Option<ReputationRecord>, DataSourceError> {
            Ok(self.market.reputation(address).cloned())
        }

        async fn user_exposures(&self, _user: &str) -> Result<Vec<ExposureRecord>, DataSourceError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_ongoing_condition_is_raised_once() {
        let market = DemoDataSource::new(5, Utc::now().timestamp()).market().clone();
        let monitor = monitor(Arc::new(LiveSource { market }), MonitorConfig::default());

        let first = monitor.tick().await.unwrap();
        assert!(first.alerts.iter().any(|a| a.severity() == Severity::Critical));
        let raised = monitor.stats().await.alerts_raised;
        monitor.mark_all_read().await;

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let second = monitor.tick().await.unwrap();
        assert_ne!(first.evaluated_at, second.evaluated_at);

        assert_eq!(monitor.stats().await.alerts_raised, raised);
        assert_eq!(monitor.inbox().await.len(), raised as usize);
        assert_eq!(monitor.unread_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_snapshot_counts_as_failed_pass() {
        let source = Arc::new(SnapshotFileSource::new("/nonexistent/snapshot.json"));
        let monitor = monitor(source, MonitorConfig::default());
        assert!(matches!(monitor.tick().await, Err(AppError::DataSource(_))));
        assert_eq!(monitor.stats().await.failed_passes, 1);
    }

    #[tokio::test]
    async fn test_run_for_writes_latest_pass() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("latest.json");
        let source = Arc::new(DemoDataSource::new(9, 1_700_000_000));
        let config = MonitorConfig {
            interval: Duration::from_millis(20),
            user: None,
            output: Some(output.clone()),
        };
        let stats = monitor(source, config)
            .run_for(&TokioScheduler, Some(Duration::from_millis(70)))
            .await
            .unwrap();

        assert!(stats.passes >= 1);
        let written: MonitoringReport =
            serde_json::from_str(&tokio::fs::read_to_string(&output).await.unwrap()).unwrap();
        assert_eq!(written.analyses.len(), 5);
    }
}
