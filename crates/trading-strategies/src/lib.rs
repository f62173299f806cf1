//! Signal evaluation for the daily runner.
//!
//! A single long-only rule set: trade in the direction of the short/long
//! moving-average trend, entering on oversold RSI and exiting on overbought
//! RSI, gated by a buy cooldown and tagged with holding-period advisories.

mod config;
mod evaluator;
mod holding;

pub use config::{PositionSource, SignalConfig};
pub use evaluator::SignalEvaluator;
pub use holding::HoldingState;
