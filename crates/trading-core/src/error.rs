//! Error types for the trading system.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level trading system error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Whether this error must abort the run instead of skipping one symbol.
    ///
    /// Authentication failures against the broker and cache storage that
    /// cannot be read or written are fatal. Everything else is scoped to the
    /// symbol being processed.
    pub fn is_fatal(&self) -> bool {
        match self {
            TradingError::Broker(BrokerError::AuthenticationError(_)) => true,
            TradingError::Broker(BrokerError::Configuration(_)) => true,
            TradingError::Cache(CacheError::Io { .. }) => true,
            TradingError::Cache(CacheError::Locked(_)) => true,
            TradingError::Config(_) => true,
            _ => false,
        }
    }
}

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },
}

/// Broker-specific errors.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Insufficient buying power: {0}")]
    InsufficientBuyingPower(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Timed out after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    #[error("API error: {0}")]
    ApiError(String),
}

/// Data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Rate limited by data provider")]
    RateLimited,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Malformed series for {symbol}: {reason}")]
    Malformed { symbol: String, reason: String },

    #[error("Timed out after {secs}s fetching {symbol}")]
    Timeout { symbol: String, secs: u64 },

    #[error("Data source error: {0}")]
    Internal(String),
}

impl DataError {
    /// Transient failures worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::RateLimited | DataError::ConnectionError(_) | DataError::Timeout { .. }
        )
    }
}

/// Price history cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache is locked by another run: {0}")]
    Locked(PathBuf),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Notification sink errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notifier configuration error: {0}")]
    Configuration(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}
