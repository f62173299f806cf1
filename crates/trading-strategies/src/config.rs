//! Signal configuration.

use serde::{Deserialize, Serialize};
use trading_core::{error::StrategyError, traits::StrategyConfig};
use trading_indicators::IndicatorParams;

/// Where held quantity and purchase dates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSource {
    /// Broker position and order history
    #[default]
    Gateway,
    /// Trade metadata recorded in the local cache.
    ///
    /// The cache is wiped whenever the epoch changes, metadata included, so
    /// this only remembers trades placed earlier on the same day. A position
    /// bought yesterday reads as flat today: it can be bought again and is
    /// never sold. Use `Gateway` for anything that holds overnight.
    Cache,
}

impl std::fmt::Display for PositionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSource::Gateway => write!(f, "gateway"),
            PositionSource::Cache => write!(f, "cache"),
        }
    }
}

/// Configuration for the MA trend + RSI signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// RSI window
    pub rsi_period: usize,
    /// Short moving average window
    pub short_window: usize,
    /// Long moving average window (also the minimum history)
    pub long_window: usize,
    /// Buy below this RSI
    pub oversold: f64,
    /// Sell above this RSI
    pub overbought: f64,
    /// Fraction of balance committed per entry
    pub risk_fraction: f64,
    /// Hours after a filled buy during which new buys are blocked (0 disables)
    pub cooldown_hours: u32,
    /// Days after which a holding counts as long-term
    pub long_term_hold_days: u32,
    /// Source of position and purchase-date state
    pub position_source: PositionSource,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            short_window: 50,
            long_window: 200,
            oversold: 30.0,
            overbought: 70.0,
            risk_fraction: 0.02,
            cooldown_hours: 720,
            long_term_hold_days: 365,
            position_source: PositionSource::Gateway,
        }
    }
}

impl SignalConfig {
    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            rsi_period: self.rsi_period,
            short_window: self.short_window,
            long_window: self.long_window,
        }
    }
}

impl StrategyConfig for SignalConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.rsi_period < 2 {
            return Err(StrategyError::InvalidConfig(
                "RSI period must be at least 2".into(),
            ));
        }
        if self.short_window == 0 {
            return Err(StrategyError::InvalidConfig(
                "Short window must be positive".into(),
            ));
        }
        if self.short_window >= self.long_window {
            return Err(StrategyError::InvalidConfig(
                "Short window must be less than long window".into(),
            ));
        }
        if self.overbought <= self.oversold {
            return Err(StrategyError::InvalidConfig(
                "Overbought must be greater than oversold".into(),
            ));
        }
        if self.overbought > 100.0 || self.oversold < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "RSI thresholds must be between 0 and 100".into(),
            ));
        }
        if !(self.risk_fraction > 0.0 && self.risk_fraction <= 1.0) {
            return Err(StrategyError::InvalidConfig(
                "Risk fraction must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SignalConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SignalConfig::default();
        config.short_window = 200;
        assert!(config.validate().is_err());

        let mut config = SignalConfig::default();
        config.oversold = 80.0;
        assert!(config.validate().is_err());

        let mut config = SignalConfig::default();
        config.risk_fraction = 0.0;
        assert!(config.validate().is_err());

        let mut config = SignalConfig::default();
        config.cooldown_hours = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: SignalConfig =
            serde_json::from_str(r#"{"cooldown_hours": 0, "position_source": "cache"}"#).unwrap();
        assert_eq!(config.cooldown_hours, 0);
        assert_eq!(config.position_source, PositionSource::Cache);
        assert_eq!(config.long_window, 200);
    }
}
