//! Configuration structures.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use trading_core::{traits::StrategyConfig, TradingError};
use trading_strategies::SignalConfig;

pub const DEFAULT_UNIVERSE_URL: &str =
    "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/main/data/constituents.csv";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub alpaca: AlpacaSettings,
    #[serde(default)]
    pub strategy: SignalConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub universe: UniverseSettings,
    #[serde(default)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

/// Upper bound on `data.max_retries`.
pub const MAX_FETCH_RETRIES: u32 = 10;

impl AppConfig {
    /// Check the strategy and cross-section rules.
    pub fn validate(&self) -> Result<(), TradingError> {
        self.strategy.validate()?;

        if self.data.lookback_bars < self.strategy.long_window {
            return Err(TradingError::Config(format!(
                "data.lookback_bars ({}) must be at least strategy.long_window ({})",
                self.data.lookback_bars, self.strategy.long_window
            )));
        }
        if self.data.request_timeout_secs == 0 {
            return Err(TradingError::Config(
                "data.request_timeout_secs must be positive".into(),
            ));
        }
        if self.data.max_retries > MAX_FETCH_RETRIES {
            return Err(TradingError::Config(format!(
                "data.max_retries ({}) must be at most {}",
                self.data.max_retries, MAX_FETCH_RETRIES
            )));
        }
        if self.data.provider == DataProvider::Csv && self.data.csv_dir.is_none() {
            return Err(TradingError::Config(
                "data.csv_dir is required for the csv provider".into(),
            ));
        }

        match self.universe.source {
            UniverseKind::Static if self.universe.symbols.is_empty() => {
                return Err(TradingError::Config(
                    "universe.symbols must not be empty for a static universe".into(),
                ))
            }
            UniverseKind::File if self.universe.path.is_none() => {
                return Err(TradingError::Config(
                    "universe.path is required for a file universe".into(),
                ))
            }
            UniverseKind::Url if self.universe.url.trim().is_empty() => {
                return Err(TradingError::Config(
                    "universe.url is required for a url universe".into(),
                ))
            }
            _ => {}
        }

        if self.execution.paper_capital < Decimal::ZERO {
            return Err(TradingError::Config(
                "execution.paper_capital must not be negative".into(),
            ));
        }

        Ok(())
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "signal-trader".to_string(),
            environment: "development".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Alpaca API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlpacaSettings {
    pub api_key_env: String,
    pub api_secret_env: String,
    /// Overrides the paper/live host
    pub base_url: Option<String>,
    pub paper: bool,
}

impl Default for AlpacaSettings {
    fn default() -> Self {
        Self {
            api_key_env: "APCA_API_KEY_ID".to_string(),
            api_secret_env: "APCA_API_SECRET_KEY".to_string(),
            base_url: None,
            paper: true,
        }
    }
}

/// Price history cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub path: PathBuf,
    /// Write the cache after every fetch, not only at the end of the run
    pub persist_after_fetch: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/stock_data_cache.json"),
            persist_after_fetch: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataProvider {
    #[default]
    Yahoo,
    Csv,
}

/// Market data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub provider: DataProvider,
    pub csv_dir: Option<PathBuf>,
    /// Trailing daily bars requested per symbol
    pub lookback_bars: usize,
    pub request_timeout_secs: u64,
    /// Retries for transient fetch failures
    pub max_retries: u32,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            provider: DataProvider::Yahoo,
            csv_dir: None,
            lookback_bars: 250,
            request_timeout_secs: 30,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniverseKind {
    Static,
    File,
    #[default]
    Url,
}

/// Instrument universe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSettings {
    pub source: UniverseKind,
    pub symbols: Vec<String>,
    pub path: Option<PathBuf>,
    pub url: String,
    /// Symbols starting with any of these are skipped
    pub excluded_prefixes: Vec<String>,
}

impl Default for UniverseSettings {
    fn default() -> Self {
        Self {
            source: UniverseKind::Url,
            symbols: Vec::new(),
            path: None,
            url: DEFAULT_UNIVERSE_URL.to_string(),
            excluded_prefixes: vec!["BRK".to_string(), "BF".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    #[default]
    Alpaca,
    Paper,
}

/// Order execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    pub broker: BrokerKind,
    /// Starting cash for the paper broker
    pub paper_capital: Decimal,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            broker: BrokerKind::Alpaca,
            paper_capital: dec!(100000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Log,
    Twilio,
}

/// Notification sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub sink: NotifierKind,
    pub twilio_sid_env: String,
    pub twilio_token_env: String,
    pub twilio_from_env: String,
    pub twilio_to_env: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            sink: NotifierKind::Log,
            twilio_sid_env: "TWILIO_ACCOUNT_SID".to_string(),
            twilio_token_env: "TWILIO_AUTH_TOKEN".to_string(),
            twilio_from_env: "TWILIO_PHONE_NUMBER".to_string(),
            twilio_to_env: "RECIPIENT_PHONE_NUMBER".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_strategies::PositionSource;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy.cooldown_hours, 720);
        assert_eq!(config.universe.excluded_prefixes, vec!["BRK", "BF"]);
        assert_eq!(config.cache.path, PathBuf::from("data/stock_data_cache.json"));
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [strategy]
            cooldown_hours = 0
            position_source = "cache"

            [universe]
            source = "static"
            symbols = ["AAPL", "MSFT"]

            [execution]
            broker = "paper"
            "#,
        )
        .unwrap();

        assert_eq!(config.strategy.cooldown_hours, 0);
        assert_eq!(config.strategy.position_source, PositionSource::Cache);
        assert_eq!(config.strategy.long_window, 200);
        assert_eq!(config.universe.source, UniverseKind::Static);
        assert_eq!(config.execution.broker, BrokerKind::Paper);
        assert_eq!(config.execution.paper_capital, dec!(100000));
        assert_eq!(config.data.lookback_bars, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lookback_shorter_than_long_window() {
        let mut config = AppConfig::default();
        config.data.lookback_bars = 100;
        assert!(matches!(config.validate(), Err(TradingError::Config(_))));
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        let mut config = AppConfig::default();
        config.strategy.overbought = 10.0;
        assert!(matches!(config.validate(), Err(TradingError::Strategy(_))));
    }

    #[test]
    fn test_static_universe_needs_symbols() {
        let mut config = AppConfig::default();
        config.universe.source = UniverseKind::Static;
        assert!(config.validate().is_err());
        config.universe.symbols = vec!["AAPL".into()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_csv_provider_needs_dir() {
        let mut config = AppConfig::default();
        config.data.provider = DataProvider::Csv;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_retries_is_capped() {
        let mut config = AppConfig::default();
        config.data.max_retries = MAX_FETCH_RETRIES;
        assert!(config.validate().is_ok());
        config.data.max_retries = 40;
        assert!(matches!(config.validate(), Err(TradingError::Config(_))));
    }
}
