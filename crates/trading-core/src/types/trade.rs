//! Per-symbol trade bookkeeping kept in the price cache.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// Last action taken on a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    #[default]
    None,
    Buy,
    Sell,
}

impl From<Side> for TradeAction {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => TradeAction::Buy,
            Side::Sell => TradeAction::Sell,
        }
    }
}

/// Trade metadata for one symbol. Created on the first buy, updated on every
/// buy or sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeMetadata {
    /// Shares currently held according to our own fills
    pub quantity: Decimal,
    /// Last action taken
    pub last_action: TradeAction,
    /// When the last action was taken
    pub last_action_at: DateTime<Utc>,
    /// When the current holding was bought (holding-period start)
    pub purchased_at: Option<DateTime<Utc>>,
    /// Reference price of the last buy
    pub entry_price: Option<Decimal>,
}

impl TradeMetadata {
    /// Metadata for a first buy.
    pub fn opened(quantity: Decimal, price: Option<Decimal>, at: DateTime<Utc>) -> Self {
        Self {
            quantity,
            last_action: TradeAction::Buy,
            last_action_at: at,
            purchased_at: Some(at),
            entry_price: price,
        }
    }

    /// Record a buy of `quantity` shares.
    pub fn record_buy(&mut self, quantity: Decimal, price: Option<Decimal>, at: DateTime<Utc>) {
        self.quantity += quantity;
        self.last_action = TradeAction::Buy;
        self.last_action_at = at;
        self.purchased_at = Some(at);
        self.entry_price = price;
    }

    /// Record a sell of `quantity` shares. The purchase date is kept so the
    /// last buy stays visible to the cooldown gate.
    pub fn record_sell(&mut self, quantity: Decimal, at: DateTime<Utc>) {
        self.quantity = (self.quantity - quantity).max(Decimal::ZERO);
        self.last_action = TradeAction::Sell;
        self.last_action_at = at;
    }
}
