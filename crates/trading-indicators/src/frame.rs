//! Indicator frame: a price series enriched with RSI and moving averages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use trading_core::error::IndicatorError;
use trading_core::traits::Indicator;
use trading_core::types::PriceSeries;

use crate::{Rsi, Sma};

/// Window sizes for the enriched columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            short_window: 50,
            long_window: 200,
        }
    }
}

/// Values of every column at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRow {
    pub date: NaiveDate,
    pub close: f64,
    pub rsi: Option<f64>,
    pub short_ma: Option<f64>,
    pub long_ma: Option<f64>,
}

impl FrameRow {
    /// All three indicators, when every one is defined.
    pub fn indicators(&self) -> Option<(f64, f64, f64)> {
        Some((self.rsi?, self.short_ma?, self.long_ma?))
    }
}

/// Price series plus derived columns, aligned index-for-index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    symbol: String,
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
    rsi: Vec<Option<f64>>,
    short_ma: Vec<Option<f64>>,
    long_ma: Vec<Option<f64>>,
}

impl IndicatorFrame {
    /// Assemble a frame from precomputed columns.
    pub fn from_columns(
        symbol: impl Into<String>,
        dates: Vec<NaiveDate>,
        closes: Vec<f64>,
        rsi: Vec<Option<f64>>,
        short_ma: Vec<Option<f64>>,
        long_ma: Vec<Option<f64>>,
    ) -> Result<Self, IndicatorError> {
        let len = dates.len();
        if closes.len() != len || rsi.len() != len || short_ma.len() != len || long_ma.len() != len
        {
            return Err(IndicatorError::InvalidParameter(format!(
                "column lengths differ: dates {}, closes {}, rsi {}, short {}, long {}",
                len,
                closes.len(),
                rsi.len(),
                short_ma.len(),
                long_ma.len()
            )));
        }

        Ok(Self {
            symbol: symbol.into(),
            dates,
            closes,
            rsi,
            short_ma,
            long_ma,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Row at `index` (0 = oldest).
    pub fn row(&self, index: usize) -> Option<FrameRow> {
        Some(FrameRow {
            date: *self.dates.get(index)?,
            close: *self.closes.get(index)?,
            rsi: *self.rsi.get(index)?,
            short_ma: *self.short_ma.get(index)?,
            long_ma: *self.long_ma.get(index)?,
        })
    }

    /// Most recent row.
    pub fn latest(&self) -> Option<FrameRow> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    pub fn rsi(&self) -> &[Option<f64>] {
        &self.rsi
    }

    pub fn short_ma(&self) -> &[Option<f64>] {
        &self.short_ma
    }

    pub fn long_ma(&self) -> &[Option<f64>] {
        &self.long_ma
    }
}

/// Enrich a price series with RSI and short/long simple moving averages.
///
/// The input is left untouched. A series shorter than `long_window` gets
/// all-undefined indicator columns.
pub fn enrich(series: &PriceSeries, params: &IndicatorParams) -> IndicatorFrame {
    let closes = series.closes();
    let len = closes.len();

    let (rsi, short_ma, long_ma) = if len < params.long_window {
        (vec![None; len], vec![None; len], vec![None; len])
    } else {
        (
            Rsi::new(params.rsi_period).calculate_aligned(&closes),
            Sma::new(params.short_window).calculate_aligned(&closes),
            Sma::new(params.long_window).calculate_aligned(&closes),
        )
    };

    IndicatorFrame {
        symbol: series.symbol().to_string(),
        dates: series.dates(),
        closes,
        rsi,
        short_ma,
        long_ma,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use trading_core::types::Bar;

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(start + Duration::days(i as i64), c, c, c, c, 1000.0))
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    #[test]
    fn test_short_history_is_all_undefined() {
        let closes: Vec<f64> = (0..199).map(|i| 100.0 + i as f64).collect();
        let series = series_from_closes(&closes);
        let frame = enrich(&series, &IndicatorParams::default());

        assert_eq!(frame.len(), 199);
        assert!(frame.rsi().iter().all(Option::is_none));
        assert!(frame.short_ma().iter().all(Option::is_none));
        assert!(frame.long_ma().iter().all(Option::is_none));
        assert!(frame.latest().unwrap().indicators().is_none());
    }

    #[test]
    fn test_full_history_defines_latest_row() {
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + i as f64).collect();
        let series = series_from_closes(&closes);
        let frame = enrich(&series, &IndicatorParams::default());

        let latest = frame.latest().unwrap();
        let (rsi, short_ma, long_ma) = latest.indicators().unwrap();
        assert!((rsi - 100.0).abs() < 1e-10);
        // Mean of the last 50 closes: 300..=349
        assert!((short_ma - 324.5).abs() < 1e-9);
        // Mean of the last 200 closes: 150..=349
        assert!((long_ma - 249.5).abs() < 1e-9);
        assert_eq!(latest.close, 349.0);

        // Columns keep their own warmup
        assert!(frame.long_ma()[198].is_none());
        assert!(frame.long_ma()[199].is_some());
        assert!(frame.short_ma()[49].is_some());
        assert!(frame.rsi()[13].is_none());
        assert!(frame.rsi()[14].is_some());
    }

    #[test]
    fn test_enrich_leaves_input_untouched() {
        let closes: Vec<f64> = (0..210).map(|i| 50.0 + (i as f64 * 0.3).sin()).collect();
        let series = series_from_closes(&closes);
        let before = series.clone();

        let frame = enrich(&series, &IndicatorParams::default());
        assert_eq!(series, before);
        assert_eq!(frame.len(), series.len());
        assert_eq!(frame.symbol(), "TEST");
    }

    #[test]
    fn test_from_columns_rejects_ragged_columns() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let result = IndicatorFrame::from_columns(
            "X",
            vec![date],
            vec![1.0],
            vec![None, None],
            vec![None],
            vec![None],
        );
        assert!(result.is_err());
    }
}
