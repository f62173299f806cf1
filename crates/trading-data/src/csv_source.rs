//! CSV directory data source for offline runs.
//!
//! Expects one file per symbol named `{SYMBOL}.csv` with a header row.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use trading_core::error::DataError;
use trading_core::traits::DataSource;
use trading_core::types::{Bar, PriceSeries};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Reads daily bars from a directory of per-symbol CSV files.
pub struct CsvDataSource {
    dir: PathBuf,
}

impl CsvDataSource {
    /// Create a new CSV data source rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DataError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(DataError::Internal(format!(
                "CSV directory not found: {}",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    fn path_for(&self, symbol: &str) -> Option<PathBuf> {
        [symbol.to_string(), symbol.to_uppercase(), symbol.replace('.', "-")]
            .into_iter()
            .map(|name| self.dir.join(format!("{}.csv", name)))
            .find(|p| p.is_file())
    }

    /// Load every bar in `path`, sorted by date.
    fn load_from_path(symbol: &str, path: &Path) -> Result<PriceSeries, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut bars = Vec::new();

        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;

            let date = parse_date(&record.date)?;

            bars.push(Bar::new(
                date,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            ));
        }

        PriceSeries::from_unsorted(symbol, bars)
    }
}

#[async_trait]
impl DataSource for CsvDataSource {
    async fn get_daily_bars(&self, symbol: &str, lookback: usize) -> Result<PriceSeries, DataError> {
        let path = self
            .path_for(symbol)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;

        let series = Self::load_from_path(symbol, &path)?;
        if series.is_empty() {
            return Err(DataError::NoDataAvailable);
        }

        Ok(series.truncate_to_last(lookback))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Parse various date formats to a calendar day.
fn parse_date(date_str: &str) -> Result<NaiveDate, DataError> {
    let date_str = date_str.trim();
    let formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

    for format in formats {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d);
        }
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }

    // Unix timestamp, milliseconds if > 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        let secs = if ts > 10_000_000_000 { ts / 1000 } else { ts };
        if let Some(dt) = DateTime::from_timestamp(secs, 0) {
            return Ok(dt.date_naive());
        }
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}
