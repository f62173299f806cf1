//! Core data types for the trading system.

mod account;
mod decision;
mod ohlcv;
mod order;
mod trade;

pub use account::{AccountSnapshot, PositionSnapshot};
pub use decision::{Advisory, DecisionReason, Evaluation, TradeDecision};
pub use ohlcv::{Bar, PriceSeries};
pub use order::{Order, OrderRequest, OrderStatus, OrderType, Side, TimeInForce};
pub use trade::{TradeAction, TradeMetadata};
