//! Core traits for the trading system.

mod broker;
mod data_source;
mod indicator;
mod notifier;
mod strategy;

pub use broker::{AccountGateway, OrderGateway};
pub use data_source::{DataSource, UniverseSource};
pub use indicator::Indicator;
pub use notifier::Notifier;
pub use strategy::StrategyConfig;
