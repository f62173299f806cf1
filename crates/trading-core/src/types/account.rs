//! Account and position snapshots read from the broker.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance and status of the brokerage account.
///
/// Read fresh for every evaluation and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Funds available for new entries
    pub balance: Decimal,
    /// Broker-reported account status (e.g. `ACTIVE`)
    pub status: String,
}

impl AccountSnapshot {
    pub fn new(balance: Decimal, status: impl Into<String>) -> Self {
        Self {
            balance,
            status: status.into(),
        }
    }

    /// Check whether any funds are available.
    pub fn is_funded(&self) -> bool {
        self.balance > Decimal::ZERO
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

/// Held quantity and cost basis for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Number of shares held
    pub quantity: Decimal,
    /// Average entry price
    pub avg_entry_price: Decimal,
}

impl PositionSnapshot {
    pub fn new(quantity: Decimal, avg_entry_price: Decimal) -> Self {
        Self {
            quantity,
            avg_entry_price,
        }
    }

    /// No position.
    pub fn flat() -> Self {
        Self::default()
    }

    /// Check if the position is flat (no shares).
    pub fn is_flat(&self) -> bool {
        self.quantity == Decimal::ZERO
    }

    /// Cost basis (quantity * avg_entry_price).
    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.avg_entry_price
    }
}
