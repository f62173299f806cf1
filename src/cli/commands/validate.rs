//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use trading_config::{AppConfig, ConfigError, UniverseKind};

pub fn run(config_path: &Path, loaded: Result<AppConfig, ConfigError>) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    let strategy = &config.strategy;
    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Broker: {:?} (Alpaca paper mode: {})", config.execution.broker, config.alpaca.paper);
    println!("Data provider: {:?}", config.data.provider);
    println!(
        "Signal: MA {}/{}, RSI {} ({} / {})",
        strategy.short_window,
        strategy.long_window,
        strategy.rsi_period,
        strategy.oversold,
        strategy.overbought
    );
    println!("Risk fraction: {}", strategy.risk_fraction);
    println!("Cooldown: {}h", strategy.cooldown_hours);
    println!("Position source: {}", strategy.position_source);
    println!("Cache: {}", config.cache.path.display());
    match config.universe.source {
        UniverseKind::Static => println!("Universe: {} symbols", config.universe.symbols.len()),
        UniverseKind::File => println!("Universe: file {:?}", config.universe.path),
        UniverseKind::Url => println!("Universe: {}", config.universe.url),
    }
    println!("Notifications: {:?}", config.notifications.sink);

    Ok(())
}
