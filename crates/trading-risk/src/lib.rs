//! Risk controls for the daily signal.
//!
//! Provides position sizing and the time-window gates (buy cooldown,
//! long-term holding period).

mod position_sizer;
mod timing;

pub use position_sizer::PositionSizer;
pub use timing::{CooldownGate, HoldingPeriod};
