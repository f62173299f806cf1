//! Technical indicators for the daily signal.
//!
//! - Simple moving average (SMA)
//! - Relative Strength Index (RSI) over simple rolling means
//! - [`IndicatorFrame`]: a price series enriched with both, aligned bar for bar

pub mod frame;
pub mod momentum;
pub mod moving_average;

pub use frame::{enrich, FrameRow, IndicatorFrame, IndicatorParams};
pub use momentum::Rsi;
pub use moving_average::Sma;
