//! Trade decisions produced by the signal evaluator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderRequest, Side};

/// What to do with one symbol in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "quantity")]
pub enum TradeDecision {
    Buy(Decimal),
    Sell(Decimal),
    Hold,
}

impl TradeDecision {
    pub fn is_hold(&self) -> bool {
        matches!(self, TradeDecision::Hold)
    }

    /// Order side for actionable decisions.
    pub fn side(&self) -> Option<Side> {
        match self {
            TradeDecision::Buy(_) => Some(Side::Buy),
            TradeDecision::Sell(_) => Some(Side::Sell),
            TradeDecision::Hold => None,
        }
    }

    /// Build the market order for this decision.
    pub fn order_request(&self, symbol: &str) -> Option<OrderRequest> {
        match *self {
            TradeDecision::Buy(quantity) => Some(OrderRequest::market(symbol, Side::Buy, quantity)),
            TradeDecision::Sell(quantity) => {
                Some(OrderRequest::market(symbol, Side::Sell, quantity))
            }
            TradeDecision::Hold => None,
        }
    }
}

/// Why the evaluator reached its decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum DecisionReason {
    /// Not enough history or an indicator is undefined on the latest bar
    InsufficientData { bars: usize, required: usize },
    /// Account balance is zero or negative
    NonPositiveBalance,
    /// A buy was filled too recently
    CooldownActive { hours_remaining: i64 },
    /// Entry conditions met but the sized order is zero shares
    InsufficientFunds,
    /// Short MA above long MA with RSI oversold and no position
    EntrySignal { rsi: f64, short_ma: f64, long_ma: f64 },
    /// Short MA below long MA with RSI overbought and a position held
    ExitSignal { rsi: f64, short_ma: f64, long_ma: f64 },
    /// Neither entry nor exit conditions hold
    NoSignal,
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionReason::InsufficientData { bars, required } => {
                write!(f, "insufficient data ({} of {} bars)", bars, required)
            }
            DecisionReason::NonPositiveBalance => write!(f, "account balance not positive"),
            DecisionReason::CooldownActive { hours_remaining } => {
                write!(f, "cooldown active ({}h remaining)", hours_remaining)
            }
            DecisionReason::InsufficientFunds => write!(f, "insufficient funds"),
            DecisionReason::EntrySignal { rsi, short_ma, long_ma } => write!(
                f,
                "entry: MA {:.2} > {:.2}, RSI {:.1}",
                short_ma, long_ma, rsi
            ),
            DecisionReason::ExitSignal { rsi, short_ma, long_ma } => write!(
                f,
                "exit: MA {:.2} < {:.2}, RSI {:.1}",
                short_ma, long_ma, rsi
            ),
            DecisionReason::NoSignal => write!(f, "no signal"),
        }
    }
}

/// Non-blocking warnings attached to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "advisory")]
pub enum Advisory {
    /// Selling before the long-term holding threshold
    ShortTermGains { held_days: Option<i64> },
}

/// Full evaluator output for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub symbol: String,
    pub decision: TradeDecision,
    pub reason: DecisionReason,
    pub advisories: Vec<Advisory>,
}

impl Evaluation {
    pub fn hold(symbol: impl Into<String>, reason: DecisionReason) -> Self {
        Self {
            symbol: symbol.into(),
            decision: TradeDecision::Hold,
            reason,
            advisories: Vec::new(),
        }
    }

    /// Check whether a short-term gains advisory is attached.
    pub fn is_short_term_sale(&self) -> bool {
        self.advisories
            .iter()
            .any(|a| matches!(a, Advisory::ShortTermGains { .. }))
    }
}
