//! Paper trading broker for dry runs and simulation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use trading_core::error::BrokerError;
use trading_core::traits::{AccountGateway, OrderGateway};
use trading_core::types::{AccountSnapshot, Order, OrderRequest, PositionSnapshot, Side};

#[derive(Debug, Default)]
struct PaperState {
    cash: Decimal,
    positions: HashMap<String, PositionSnapshot>,
    last_buys: HashMap<String, DateTime<Utc>>,
    marks: HashMap<String, Decimal>,
    orders: Vec<Order>,
}

/// In-memory broker. Market orders fill immediately at the symbol's mark
/// price; without a mark they fill with no cash movement.
#[derive(Clone)]
pub struct PaperBroker {
    state: Arc<Mutex<PaperState>>,
}

impl PaperBroker {
    /// Create a new paper broker with initial capital.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            state: Arc::new(Mutex::new(PaperState {
                cash: initial_capital,
                ..PaperState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the fill price for a symbol.
    pub fn set_mark(&self, symbol: &str, price: Decimal) {
        self.state().marks.insert(symbol.to_string(), price);
    }

    /// Overwrite the cash balance.
    pub fn set_cash(&self, cash: Decimal) {
        self.state().cash = cash;
    }

    /// Seed an open position and the time it was bought.
    pub fn seed_position(
        &self,
        symbol: &str,
        position: PositionSnapshot,
        bought_at: Option<DateTime<Utc>>,
    ) {
        let mut state = self.state();
        state.positions.insert(symbol.to_string(), position);
        if let Some(at) = bought_at {
            state.last_buys.insert(symbol.to_string(), at);
        }
    }

    /// Every order accepted so far, oldest first.
    pub fn orders(&self) -> Vec<Order> {
        self.state().orders.clone()
    }

    pub fn cash(&self) -> Decimal {
        self.state().cash
    }
}

#[async_trait]
impl AccountGateway for PaperBroker {
    async fn get_account(&self) -> Result<AccountSnapshot, BrokerError> {
        Ok(AccountSnapshot::new(self.state().cash, "ACTIVE"))
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<PositionSnapshot>, BrokerError> {
        Ok(self
            .state()
            .positions
            .get(symbol)
            .copied()
            .filter(|p| !p.is_flat()))
    }

    async fn last_filled_buy(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, BrokerError> {
        Ok(self.state().last_buys.get(symbol).copied())
    }

    fn name(&self) -> &str {
        "Paper Broker"
    }
}

#[async_trait]
impl OrderGateway for PaperBroker {
    async fn submit_order(&self, request: OrderRequest) -> Result<Order, BrokerError> {
        if request.quantity <= Decimal::ZERO {
            return Err(BrokerError::OrderRejected(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }

        let mut guard = self.state();
        let state = &mut *guard;
        let mark = state.marks.get(&request.symbol).copied();
        let notional = mark.map(|p| p * request.quantity).unwrap_or(Decimal::ZERO);
        let now = Utc::now();

        match request.side {
            Side::Buy => {
                if notional > state.cash {
                    return Err(BrokerError::InsufficientBuyingPower(format!(
                        "need {}, have {}",
                        notional, state.cash
                    )));
                }
                state.cash -= notional;

                let position = state.positions.entry(request.symbol.clone()).or_default();
                let total = position.quantity + request.quantity;
                if let Some(price) = mark {
                    position.avg_entry_price =
                        (position.cost_basis() + price * request.quantity) / total;
                }
                position.quantity = total;
                state.last_buys.insert(request.symbol.clone(), now);
            }
            Side::Sell => {
                let held = state
                    .positions
                    .get(&request.symbol)
                    .map(|p| p.quantity)
                    .unwrap_or(Decimal::ZERO);
                if request.quantity > held {
                    return Err(BrokerError::OrderRejected(format!(
                        "cannot sell {} {}, holding {}",
                        request.quantity, request.symbol, held
                    )));
                }
                state.cash += notional;
                let flat = match state.positions.get_mut(&request.symbol) {
                    Some(position) => {
                        position.quantity -= request.quantity;
                        position.is_flat()
                    }
                    None => false,
                };
                if flat {
                    state.positions.remove(&request.symbol);
                }
            }
        }

        let mut order = Order::from_request(&request);
        order.fill(mark, now);
        debug!(symbol = %order.symbol, side = %order.side, quantity = %order.quantity, "Paper fill");
        state.orders.push(order.clone());
        Ok(order)
    }
}
