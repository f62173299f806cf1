//! Position sizing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Sizes entries as a fixed fraction of the account balance, rounded down to
/// whole shares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSizer {
    risk_fraction: Decimal,
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::new(dec!(0.02))
    }
}

impl PositionSizer {
    /// Create a sizer that commits `risk_fraction` of the balance per entry.
    pub fn new(risk_fraction: Decimal) -> Self {
        Self { risk_fraction }
    }

    /// Build from a floating-point fraction (as read from config).
    pub fn from_fraction(risk_fraction: f64) -> Self {
        Self::new(Decimal::try_from(risk_fraction).unwrap_or(Decimal::ZERO))
    }

    pub fn risk_fraction(&self) -> Decimal {
        self.risk_fraction
    }

    /// Whole shares to buy at `price` with `balance` available.
    ///
    /// Returns zero when either input is not positive.
    pub fn shares_for(&self, balance: Decimal, price: Decimal) -> Decimal {
        if balance <= Decimal::ZERO || price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        (balance * self.risk_fraction / price).floor().max(Decimal::ZERO)
    }

    /// Same as [`shares_for`](Self::shares_for) for an f64 close price.
    pub fn shares_for_close(&self, balance: Decimal, close: f64) -> Decimal {
        match Decimal::try_from(close) {
            Ok(price) => self.shares_for(balance, price),
            Err(_) => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_percent_of_ten_thousand_at_45() {
        let sizer = PositionSizer::new(dec!(0.02));
        // 10000 * 0.02 = 200, 200 / 45 = 4.44
        assert_eq!(sizer.shares_for(dec!(10000), dec!(45)), dec!(4));
        assert_eq!(sizer.shares_for_close(dec!(10000), 45.0), dec!(4));
    }

    #[test]
    fn test_price_above_budget_gives_zero() {
        let sizer = PositionSizer::default();
        assert_eq!(sizer.shares_for(dec!(1000), dec!(25)), dec!(0));
    }

    #[test]
    fn test_non_positive_inputs() {
        let sizer = PositionSizer::default();
        assert_eq!(sizer.shares_for(dec!(0), dec!(10)), dec!(0));
        assert_eq!(sizer.shares_for(dec!(-500), dec!(10)), dec!(0));
        assert_eq!(sizer.shares_for(dec!(10000), dec!(0)), dec!(0));
        assert_eq!(sizer.shares_for_close(dec!(10000), f64::NAN), dec!(0));
    }

    #[test]
    fn test_from_fraction() {
        let sizer = PositionSizer::from_fraction(0.02);
        assert_eq!(sizer.risk_fraction(), dec!(0.02));
    }
}
