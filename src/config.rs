use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::domain::alerts::AlertPolicy;
use crate::domain::liquidity::{MatchingConfig, OutflowThresholds};
use crate::domain::portfolio::PortfolioPolicy;
use crate::domain::scoring::{HealthWeights, RiskComponentWeights, TrustWeights};
use crate::shared::errors::AppError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringCfg {
    pub health: HealthWeights,
    pub trust: TrustWeights,
    pub risk_components: RiskComponentWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingCfg {
    pub interval_secs: u64,
    /// One of the 6/12/24/48 hour views; 0 disables the filter
    pub lookback_hours: u32,
    /// Stop monitoring after this many seconds; runs until Ctrl-C when unset
    pub duration_secs: Option<u64>,
}

impl Default for PollingCfg {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            lookback_hours: 24,
            duration_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingCfg {
    pub level: String,
}

impl Default for LoggingCfg {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataCfg {
    pub snapshot_path: Option<String>,
    pub demo_seed: u64,
    pub health_jitter: bool,
}

impl Default for DataCfg {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            demo_seed: 42,
            health_jitter: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: OutflowThresholds,
    pub matching: MatchingConfig,
    pub alerts: AlertPolicy,
    pub portfolio: PortfolioPolicy,
    pub scoring: ScoringCfg,
    pub polling: PollingCfg,
    pub logging: LoggingCfg,
    pub data: DataCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Self = toml::from_str(&s).context("parse Config.toml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject weight tables that do not sum to 1.0 and nonsensical thresholds
    pub fn validate(&self) -> Result<(), AppError> {
        let check = |table: &str, result: crate::shared::errors::AnalysisResult<()>| {
            result.map_err(|e| AppError::ConfigError(format!("[scoring.{}] {}", table, e)))
        };
        check("health", self.scoring.health.validate())?;
        check("trust", self.scoring.trust.validate())?;
        check("risk_components", self.scoring.risk_components.validate())?;

        let d = &self.detection;
        if d.min_hours <= 0.0 {
            return Err(AppError::ConfigError("[detection] min_hours must be positive".into()));
        }
        if d.severe_rate_per_hour < d.moderate_rate_per_hour || d.severe_change_pct > d.moderate_change_pct {
            return Err(AppError::ConfigError(
                "[detection] severe thresholds must be stricter than moderate ones".into(),
            ));
        }
        if self.matching.max_points == 0 {
            return Err(AppError::ConfigError("[matching] max_points must be at least one".into()));
        }
        if self.polling.interval_secs == 0 {
            return Err(AppError::ConfigError("[polling] interval_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let cfg = Config::from_file(file.path()).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.detection.severe_rate_per_hour, 0.05);
        assert_eq!(cfg.alerts.critical_threshold_pct, 25.0);
        assert_eq!(cfg.portfolio.concentration_pct, 40.0);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_partial_sections_override_defaults() {
        let file = write_config(
            r#"
[detection]
severe_change_pct = -15.0

[alerts]
critical_threshold_pct = 30.0

[polling]
interval_secs = 5
duration_secs = 20

[data]
snapshot_path = "data/snapshot.json"
"#,
        );
        let cfg = Config::from_file(file.path()).unwrap();
        assert_eq!(cfg.detection.severe_change_pct, -15.0);
        assert_eq!(cfg.detection.moderate_change_pct, -5.0);
        assert_eq!(cfg.alerts.critical_threshold_pct, 30.0);
        assert_eq!(cfg.polling.duration_secs, Some(20));
        assert_eq!(cfg.polling.lookback_hours, 24);
        assert_eq!(cfg.data.snapshot_path.as_deref(), Some("data/snapshot.json"));
    }

    #[test]
    fn test_bad_weights_are_rejected() {
        let file = write_config(
            r#"
[scoring.trust]
transparency = 0.5
"#,
        );
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("scoring.trust"));
    }

    #[test]
    fn test_validate_thresholds() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_ok());
        cfg.detection.severe_rate_per_hour = 0.01;
        assert!(matches!(cfg.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = Config::from_file("/nonexistent/sentinel.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sentinel.toml"));
    }
}
