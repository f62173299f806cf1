//! Data source trait definitions.

use crate::error::DataError;
use crate::types::PriceSeries;
use async_trait::async_trait;
use std::time::Duration;

/// Trait for historical daily price sources.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the trailing daily bars for a symbol.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to fetch
    /// * `lookback` - Number of trailing bars wanted
    ///
    /// # Returns
    /// At most `lookback` bars ordered from oldest to newest
    async fn get_daily_bars(&self, symbol: &str, lookback: usize)
        -> Result<PriceSeries, DataError>;

    /// Longest a single `get_daily_bars` call can legitimately take,
    /// retries and backoff included. `None` means one plain request.
    fn fetch_budget(&self) -> Option<Duration> {
        None
    }

    /// Get the data source name.
    fn name(&self) -> &str;
}

/// Trait for instrument universe providers.
#[async_trait]
pub trait UniverseSource: Send + Sync {
    /// Ordered list of symbols to process.
    async fn symbols(&self) -> Result<Vec<String>, DataError>;

    /// Get the source name.
    fn name(&self) -> &str;
}
