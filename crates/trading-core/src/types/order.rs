//! Order types and structures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire name used by broker REST APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type. Only market orders are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Execute immediately at best available price
    #[default]
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
        }
    }
}

/// Time in force. Orders stay open until filled or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good til canceled
    #[default]
    #[serde(rename = "gtc")]
    GTC,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::GTC => "gtc",
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order accepted by broker, not yet filled
    Accepted,
    /// Order partially filled
    PartiallyFilled,
    /// Order completely filled
    Filled,
    /// Order canceled or expired
    Canceled,
    /// Order rejected
    Rejected,
}

impl OrderStatus {
    /// Map a broker status string onto our status set.
    pub fn from_broker(status: &str) -> Self {
        match status {
            "partially_filled" => OrderStatus::PartiallyFilled,
            "filled" => OrderStatus::Filled,
            "canceled" | "expired" | "done_for_day" => OrderStatus::Canceled,
            "rejected" => OrderStatus::Rejected,
            _ => OrderStatus::Accepted,
        }
    }
}

/// Order request for submitting new orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Symbol to trade
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Type of order
    pub order_type: OrderType,
    /// Quantity to trade
    pub quantity: Decimal,
    /// Time in force
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    /// Create a good-till-cancelled market order request.
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            time_in_force: TimeInForce::GTC,
        }
    }
}

/// Broker confirmation of a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID
    pub id: Uuid,
    /// Symbol traded
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Original quantity
    pub quantity: Decimal,
    /// Current status
    pub status: OrderStatus,
    /// Quantity filled so far
    pub filled_quantity: Decimal,
    /// Average fill price
    pub filled_avg_price: Option<Decimal>,
    /// When the order was created
    pub created_at: DateTime<Utc>,
    /// When the order was filled
    pub filled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a freshly accepted order from a request.
    pub fn from_request(request: &OrderRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: request.quantity,
            status: OrderStatus::Accepted,
            filled_quantity: Decimal::ZERO,
            filled_avg_price: None,
            created_at: Utc::now(),
            filled_at: None,
        }
    }

    /// Mark the order completely filled at `price`.
    pub fn fill(&mut self, price: Option<Decimal>, at: DateTime<Utc>) {
        self.status = OrderStatus::Filled;
        self.filled_quantity = self.quantity;
        self.filled_avg_price = price;
        self.filled_at = Some(at);
    }

    /// Check if the order is completely filled.
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}
