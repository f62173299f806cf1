//! OHLCV (Open, High, Low, Close, Volume) data types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// One daily bar.
/// Uses f64 for fast indicator calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading day
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Trading volume
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Daily price history for one symbol.
///
/// Bars are strictly ascending by date with no duplicates and every close is
/// finite. The constructor enforces this, so a `PriceSeries` in hand is always
/// well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series, rejecting out-of-order, duplicate, or non-finite bars.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, DataError> {
        let symbol = symbol.into();

        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(DataError::Malformed {
                    symbol,
                    reason: format!(
                        "bars not strictly ascending at {} -> {}",
                        pair[0].date, pair[1].date
                    ),
                });
            }
        }

        if let Some(bad) = bars.iter().find(|b| !b.close.is_finite()) {
            return Err(DataError::Malformed {
                symbol,
                reason: format!("non-finite close on {}", bad.date),
            });
        }

        Ok(Self { symbol, bars })
    }

    /// Build a series from unsorted bars: sorts by date and keeps the last
    /// bar seen for any repeated date. Non-finite closes are still rejected.
    pub fn from_unsorted(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self, DataError> {
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self::new(symbol, deduped)
    }

    /// Keep only the trailing `n` bars.
    pub fn truncate_to_last(mut self, n: usize) -> Self {
        let start = self.bars.len().saturating_sub(n);
        if start > 0 {
            self.bars.drain(..start);
        }
        self
    }

    /// Symbol identifier.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the number of bars.
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Check if the series is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// All bars, oldest first.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Get the last bar.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Extract close prices as a vector.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Extract bar dates as a vector.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }
}
