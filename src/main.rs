//! Signal trader CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use trading_config::{load_config, LogFormat};
use trading_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config);

    // Setup logging from config, with CLI overrides
    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .or_else(|| config.as_ref().ok().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let json = cli.json_logs
        || config
            .as_ref()
            .is_ok_and(|c| c.logging.format == LogFormat::Json);
    let log_file = config.as_ref().ok().and_then(|c| c.logging.file.clone());
    let _guard = setup_logging(&level, json, log_file.as_deref());

    match cli.command {
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config, config),
        Commands::Run(args) => {
            let config = config
                .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
            cli::commands::run::run(args, config).await
        }
        Commands::Cache(command) => {
            let config = config
                .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
            cli::commands::cache::run(command, &config)
        }
    }
}
