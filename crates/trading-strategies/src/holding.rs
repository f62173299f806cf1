//! Position and timing state the evaluator reads for one symbol.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use trading_core::types::{PositionSnapshot, TradeMetadata};

/// Held quantity plus the timestamps the cooldown and holding-period gates
/// need, reconciled from either the broker or the cache.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HoldingState {
    pub position: PositionSnapshot,
    /// Most recent filled buy
    pub last_buy_at: Option<DateTime<Utc>>,
    /// Start of the current holding period
    pub purchased_at: Option<DateTime<Utc>>,
}

impl HoldingState {
    /// Broker truth: open position plus the newest filled buy order.
    pub fn from_gateway(
        position: Option<PositionSnapshot>,
        last_filled_buy: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            position: position.unwrap_or_default(),
            last_buy_at: last_filled_buy,
            purchased_at: last_filled_buy,
        }
    }

    /// Cache truth: quantities and dates recorded by earlier runs of the
    /// current epoch. `None` after a daily reset reads as flat.
    pub fn from_trade_metadata(metadata: Option<&TradeMetadata>) -> Self {
        match metadata {
            Some(meta) => Self {
                position: PositionSnapshot::new(
                    meta.quantity,
                    meta.entry_price.unwrap_or(Decimal::ZERO),
                ),
                last_buy_at: meta.purchased_at,
                purchased_at: meta.purchased_at,
            },
            None => Self::default(),
        }
    }

    pub fn held_quantity(&self) -> Decimal {
        self.position.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_gateway_without_position() {
        let state = HoldingState::from_gateway(None, None);
        assert_eq!(state.held_quantity(), Decimal::ZERO);
        assert!(state.last_buy_at.is_none());
    }

    #[test]
    fn test_from_trade_metadata() {
        let bought = Utc::now();
        let mut meta = TradeMetadata::opened(dec!(12), Some(dec!(40)), bought);
        let state = HoldingState::from_trade_metadata(Some(&meta));
        assert_eq!(state.held_quantity(), dec!(12));
        assert_eq!(state.position.avg_entry_price, dec!(40));
        assert_eq!(state.purchased_at, Some(bought));

        meta.record_sell(dec!(12), Utc::now());
        let state = HoldingState::from_trade_metadata(Some(&meta));
        assert_eq!(state.held_quantity(), Decimal::ZERO);
        assert_eq!(state.last_buy_at, Some(bought));
    }

    #[test]
    fn test_missing_metadata_is_flat() {
        let state = HoldingState::from_trade_metadata(None);
        assert_eq!(state, HoldingState::default());
    }
}
