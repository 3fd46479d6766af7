mod app;

use anyhow::Result;
use clap::Parser;
use defi_sentinel::application::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Create AppCfg with priority: CLI args > Config file > Defaults
    let app_cfg = app::AppCfg::from_cli(&cli)?;
    tracing_subscriber::fmt().with_env_filter(app_cfg.env_filter()).init();

    app::run(app_cfg, cli.command).await
}
