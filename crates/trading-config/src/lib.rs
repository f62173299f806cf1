//! Configuration management.

mod settings;

pub use settings::{
    AlpacaSettings, AppConfig, AppSettings, BrokerKind, CacheSettings, DataProvider, DataSettings,
    ExecutionSettings, LogFormat, LoggingConfig, NotificationSettings, NotifierKind,
    UniverseKind, UniverseSettings, DEFAULT_UNIVERSE_URL,
};

pub use config::ConfigError;

use config::{Config, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
///
/// Environment variables override the file, e.g.
/// `TRADING__STRATEGY__COOLDOWN_HOURS=0`.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("TRADING")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}
