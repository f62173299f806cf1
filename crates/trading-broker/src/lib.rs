//! Broker integrations.
//!
//! - [`AlpacaBroker`]: REST client for Alpaca paper and live accounts
//! - [`PaperBroker`]: in-memory account for simulation and tests
//! - [`DryRunOrders`]: order gateway that only logs

mod alpaca;
mod dry_run;
mod paper;

pub use alpaca::{AlpacaBroker, AlpacaConfig, DEFAULT_KEY_VAR, DEFAULT_SECRET_VAR};
pub use dry_run::DryRunOrders;
pub use paper::PaperBroker;
