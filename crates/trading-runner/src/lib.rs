//! Daily run orchestrator.
//!
//! Drives the instrument universe through fetch, enrich, evaluate and act,
//! and reports what happened to each symbol.

mod engine;
mod report;

pub use engine::{DailyRunner, RunClock, RunConfig};
pub use report::{RunCounts, RunReport, SymbolOutcome, SymbolReport};
