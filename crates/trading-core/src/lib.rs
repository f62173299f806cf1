//! Core types and traits for the trading system.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, PriceSeries)
//! - Account, position, order and trade bookkeeping types
//! - Trade decisions and their reasons
//! - Core traits for brokers, data sources, indicators and notifiers

pub mod types;
pub mod traits;
pub mod error;

pub use error::TradingError;
pub use types::*;
pub use traits::*;
