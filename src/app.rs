// src/app.rs
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use defi_sentinel::application::{Cli, CommandExecutor, Commands};
use defi_sentinel::config::Config;

/// Resolved settings with priority: CLI args > Config file > Defaults
#[derive(Debug, Clone)]
pub struct AppCfg {
    pub config: Config,
    pub config_path: Option<String>,
    pub log_level: Option<String>,
}

impl AppCfg {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::from_file(path).with_context(|| format!("load config {}", path))?,
            None => Config::default(),
        };
        Ok(Self {
            config,
            config_path: cli.config.clone(),
            log_level: cli.log_level.clone(),
        })
    }

    /// `--log-level` wins, then RUST_LOG, then `[logging] level`
    pub fn env_filter(&self) -> EnvFilter {
        match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.logging.level)),
        }
    }
}

pub async fn run(app_cfg: AppCfg, command: Commands) -> Result<()> {
    info!("🚀 Starting DeFi Sentinel");
    match &app_cfg.config_path {
        Some(path) => info!("Configuration: {}", path),
        None => info!("Configuration: built-in defaults"),
    }

    CommandExecutor::execute(command, app_cfg.config)
        .await
        .context("command failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_config_file_and_cli_priority() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[logging]\nlevel = \"warn\"\n[polling]\ninterval_secs = 15\n").unwrap();
        let path = file.path().display().to_string();

        let cli = Cli::try_parse_from(["defi-sentinel", "--config", &path, "demo"]).unwrap();
        let app_cfg = AppCfg::from_cli(&cli).unwrap();
        assert_eq!(app_cfg.config.polling.interval_secs, 15);
        assert_eq!(app_cfg.config.logging.level, "warn");

        let cli = Cli::try_parse_from(["defi-sentinel", "demo", "--log-level", "debug"]).unwrap();
        let app_cfg = AppCfg::from_cli(&cli).unwrap();
        assert_eq!(app_cfg.config, Config::default());
        assert_eq!(app_cfg.log_level.as_deref(), Some("debug"));
    }
}
