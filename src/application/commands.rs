//! CLI commands and handlers
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::application::monitor::{MonitorConfig, SentinelMonitor};
use crate::application::scheduler::TokioScheduler;
use crate::application::services::{MonitoringReport, SentinelService};
use crate::config::Config;
use crate::infrastructure::demo_source::DEMO_USER;
use crate::infrastructure::{DemoDataSource, MarketDataSource, SnapshotFileSource};
use crate::report::{ProtocolReport, ReportType};
use crate::shared::errors::{AppError, DataSourceError, ReportError};
use crate::shared::types::Severity;
use crate::shared::utils::format_usd;

#[derive(Parser, Debug)]
#[command(name = "defi-sentinel", version)]
#[command(about = "DeFi liquidity anomaly detection and protocol risk scoring")]
pub struct Cli {
    /// Path to config file (optional)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log filter, e.g. "debug" or "defi_sentinel=trace"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Comprehensive,
    Liquidity,
    RiskAssessment,
}

impl From<ReportKind> for ReportType {
    fn from(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Comprehensive => ReportType::Comprehensive,
            ReportKind::Liquidity => ReportType::Liquidity,
            ReportKind::RiskAssessment => ReportType::RiskAssessment,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze every protocol of a snapshot and export reports
    Analyze {
        /// Snapshot JSON file (overrides [data] snapshot_path)
        #[arg(short, long)]
        snapshot: Option<String>,

        /// Only report on this protocol (address or name)
        #[arg(short, long)]
        protocol: Option<String>,

        #[arg(short = 't', long, value_enum, default_value_t = ReportKind::Comprehensive)]
        report_type: ReportKind,

        /// Directory for report files; reports go to stdout when unset
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Lookback in hours (6, 12, 24, 48; 0 for the whole history)
        #[arg(long)]
        lookback_hours: Option<u32>,
    },

    /// Assess a user's portfolio exposure
    Portfolio {
        #[arg(short, long)]
        snapshot: Option<String>,

        #[arg(short, long)]
        user: String,
    },

    /// Poll a snapshot on an interval
    Monitor {
        /// Snapshot JSON file; the seeded demo market is used when unset
        #[arg(short, long)]
        snapshot: Option<String>,

        /// Seconds between passes
        #[arg(short, long)]
        interval: Option<u64>,

        /// Seconds to run; runs until Ctrl-C when unset
        #[arg(short, long)]
        duration: Option<u64>,

        /// User whose portfolio is assessed on each pass
        #[arg(short, long)]
        user: Option<String>,

        /// File receiving the latest pass as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run one pass against the seeded demo market
    Demo {
        #[arg(long)]
        seed: Option<u64>,

        /// File receiving the pass as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub async fn execute(command: Commands, config: Config) -> Result<(), AppError> {
        match command {
            Commands::Analyze { snapshot, protocol, report_type, output, lookback_hours } => {
                Self::execute_analyze_command(snapshot, protocol, report_type.into(), output, lookback_hours, config).await
            }
            Commands::Portfolio { snapshot, user } => Self::execute_portfolio_command(snapshot, user, config).await,
            Commands::Monitor { snapshot, interval, duration, user, output } => {
                Self::execute_monitor_command(snapshot, interval, duration, user, output, config).await
            }
            Commands::Demo { seed, output } => Self::execute_demo_command(seed, output, config).await,
        }
    }

    fn snapshot_source(snapshot: Option<String>, config: &Config) -> Result<SnapshotFileSource, AppError> {
        snapshot
            .or_else(|| config.data.snapshot_path.clone())
            .map(SnapshotFileSource::new)
            .ok_or_else(|| AppError::ConfigError("no snapshot: pass --snapshot or set [data] snapshot_path".into()))
    }

    /// Execute analyze command
    async fn execute_analyze_command(
        snapshot: Option<String>,
        protocol: Option<String>,
        report_type: ReportType,
        output: Option<PathBuf>,
        lookback_hours: Option<u32>,
        mut config: Config,
    ) -> Result<(), AppError> {
        if let Some(hours) = lookback_hours {
            config.polling.lookback_hours = hours;
        }
        let service = SentinelService::new(&config)?;
        let source = Self::snapshot_source(snapshot, &config)?;
        info!("🔍 Analyzing {}", source.path().display());

        let market = source.snapshot(None).await?;
        let pass = service.run_pass(&market, None, Utc::now().timestamp());
        Self::print_pass_summary(&pass);

        let generated_at = Utc
            .timestamp_opt(pass.evaluated_at, 0)
            .single()
            .ok_or_else(|| DataSourceError::Malformed(format!("snapshot time {} is out of range", pass.evaluated_at)))?;

        let reports: Vec<ProtocolReport> = pass
            .analyses
            .iter()
            .filter(|a| {
                protocol.as_deref().map_or(true, |wanted| {
                    a.protocol.address.eq_ignore_ascii_case(wanted) || a.protocol.name.eq_ignore_ascii_case(wanted)
                })
            })
            .map(|a| ProtocolReport::new(a, report_type, generated_at))
            .collect();

        if reports.is_empty() {
            let err: AppError = match protocol {
                Some(wanted) => DataSourceError::ProtocolNotFound(wanted).into(),
                None => ReportError::Empty("snapshot holds no analyzable protocols".into()).into(),
            };
            return Err(err);
        }

        match output {
            Some(dir) => {
                tokio::fs::create_dir_all(&dir).await?;
                for report in &reports {
                    let path = dir.join(report.file_name());
                    tokio::fs::write(&path, report.to_json()?).await?;
                    info!("✅ Report written to {}", path.display());
                }
            }
            None => {
                let json = serde_json::to_string_pretty(&reports).map_err(ReportError::from)?;
                println!("{}", json);
            }
        }
        Ok(())
    }

    /// Execute portfolio command
    async fn execute_portfolio_command(snapshot: Option<String>, user: String, config: Config) -> Result<(), AppError> {
        let service = SentinelService::new(&config)?;
        let source = Self::snapshot_source(snapshot, &config)?;
        let market = source.snapshot(Some(&user)).await?;

        let holdings = market
            .user_exposures(&user)
            .ok_or_else(|| DataSourceError::ProtocolNotFound(format!("holdings of {}", user)))?;
        let assessment = service.assess_portfolio(holdings, &market.protocols);

        info!("💼 Portfolio of {}: {}", user, format_usd(assessment.total_value));
        info!("   Risk score: {:.1}/100", assessment.risk_score);
        for rec in &assessment.recommendations {
            info!("   [{}] {}", rec.severity, rec.description);
        }

        let json = serde_json::to_string_pretty(&assessment).map_err(ReportError::from)?;
        println!("{}", json);
        Ok(())
    }

    /// Execute monitor command
    async fn execute_monitor_command(
        snapshot: Option<String>,
        interval: Option<u64>,
        duration: Option<u64>,
        user: Option<String>,
        output: Option<PathBuf>,
        config: Config,
    ) -> Result<(), AppError> {
        let service = Arc::new(SentinelService::new(&config)?);
        let source: Arc<dyn MarketDataSource> = match Self::snapshot_source(snapshot, &config) {
            Ok(file) => Arc::new(file),
            Err(_) => {
                warn!("⚠️  No snapshot configured, monitoring the demo market");
                Arc::new(DemoDataSource::new(config.data.demo_seed, Utc::now().timestamp()))
            }
        };

        let monitor_config = MonitorConfig {
            interval: Duration::from_secs(interval.unwrap_or(config.polling.interval_secs).max(1)),
            user,
            output,
        };
        let duration = duration.or(config.polling.duration_secs).map(Duration::from_secs);

        info!("📊 Monitor configuration:");
        info!("   Interval: {:?}", monitor_config.interval);
        info!("   Lookback: {}h", config.polling.lookback_hours);
        match duration {
            Some(d) => info!("   Duration: {:?}", d),
            None => info!("   Duration: until Ctrl-C"),
        }

        let monitor = SentinelMonitor::new(monitor_config, service, source);
        monitor.run_for(&TokioScheduler, duration).await?;
        Ok(())
    }

    /// Execute demo command
    async fn execute_demo_command(seed: Option<u64>, output: Option<PathBuf>, config: Config) -> Result<(), AppError> {
        let seed = seed.unwrap_or(config.data.demo_seed);
        let service = SentinelService::new(&config)?;
        let demo = DemoDataSource::new(seed, Utc::now().timestamp());
        info!("🧪 Demo market with seed {}", seed);

        let market = demo.snapshot(Some(DEMO_USER)).await?;
        let pass = service.run_pass(&market, Some(DEMO_USER), Utc::now().timestamp());
        Self::print_pass_summary(&pass);

        if let Some(portfolio) = &pass.portfolio {
            info!(
                "💼 Demo portfolio {} at risk {:.1}/100",
                format_usd(portfolio.total_value),
                portfolio.risk_score
            );
            for rec in &portfolio.recommendations {
                info!("   [{}] {}", rec.severity, rec.description);
            }
        }

        if let Some(path) = output {
            let json = serde_json::to_string_pretty(&pass).map_err(ReportError::from)?;
            tokio::fs::write(&path, json).await?;
            info!("✅ Pass written to {}", path.display());
        }
        Ok(())
    }

    fn print_pass_summary(pass: &MonitoringReport) {
        for flow in &pass.flows {
            let marker = if flow.anomaly.is_severe {
                "🚨"
            } else if flow.anomaly.is_anomaly {
                "⚠️ "
            } else {
                "✅"
            };
            info!(
                "{} {}: {:+.2}% ({} -> {})",
                marker,
                flow.protocol_name,
                flow.anomaly.percentage_change,
                format_usd(flow.anomaly.initial_tvl),
                format_usd(flow.anomaly.current_tvl)
            );
        }
        for analysis in &pass.analyses {
            if let Some(banner) = &analysis.banner {
                info!("   {} [{}] {}", analysis.protocol.name, banner.level, banner.message);
            }
        }
        let critical = pass.alerts.iter().filter(|a| a.severity() == Severity::Critical).count();
        info!("🔔 {} alerts ({} critical)", pass.alerts.len(), critical);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_args() {
        let cli = Cli::try_parse_from([
            "defi-sentinel",
            "--config",
            "Config.toml",
            "analyze",
            "--snapshot",
            "snap.json",
            "-t",
            "risk-assessment",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("Config.toml"));
        match cli.command {
            Commands::Analyze { snapshot, report_type, .. } => {
                assert_eq!(snapshot.as_deref(), Some("snap.json"));
                assert_eq!(ReportType::from(report_type), ReportType::RiskAssessment);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_portfolio_requires_user() {
        assert!(Cli::try_parse_from(["defi-sentinel", "portfolio"]).is_err());
    }

    #[tokio::test]
    async fn test_analyze_writes_one_report_per_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot.json");
        let demo = DemoDataSource::new(21, 1_700_000_000);
        SnapshotFileSource::new(&snapshot_path).save(demo.market()).await.unwrap();

        let reports_dir = dir.path().join("reports");
        let command = Commands::Analyze {
            snapshot: Some(snapshot_path.display().to_string()),
            protocol: Some("lido".to_string()),
            report_type: ReportKind::Liquidity,
            output: Some(reports_dir.clone()),
            lookback_hours: None,
        };
        CommandExecutor::execute(command, Config::default()).await.unwrap();

        let written = tokio::fs::read_to_string(reports_dir.join("Lido_liquidity_Report.json")).await.unwrap();
        let report = ProtocolReport::from_json(&written).unwrap();
        assert_eq!(report.protocol.name, "Lido");
        assert_eq!(report.sections.len(), 2);
    }

    #[tokio::test]
    async fn test_analyze_unknown_protocol_fails() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot.json");
        SnapshotFileSource::new(&snapshot_path)
            .save(DemoDataSource::new(2, 1_700_000_000).market())
            .await
            .unwrap();

        let command = Commands::Analyze {
            snapshot: Some(snapshot_path.display().to_string()),
            protocol: Some("0xmissing".to_string()),
            report_type: ReportKind::Comprehensive,
            output: None,
            lookback_hours: None,
        };
        let err = CommandExecutor::execute(command, Config::default()).await.unwrap_err();
        assert!(matches!(err, AppError::DataSource(DataSourceError::ProtocolNotFound(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_snapshot_time_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot.json");
        let mut market = DemoDataSource::new(3, 1_700_000_000).market().clone();
        market.taken_at = Some(i64::MAX);
        SnapshotFileSource::new(&snapshot_path).save(&market).await.unwrap();

        let command = Commands::Analyze {
            snapshot: Some(snapshot_path.display().to_string()),
            protocol: None,
            report_type: ReportKind::Comprehensive,
            output: None,
            lookback_hours: Some(0),
        };
        let err = CommandExecutor::execute(command, Config::default()).await.unwrap_err();
        assert!(matches!(err, AppError::DataSource(DataSourceError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_config_error() {
        let command = Commands::Portfolio { snapshot: None, user: "alice".into() };
        let err = CommandExecutor::execute(command, Config::default()).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
