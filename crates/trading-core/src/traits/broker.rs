//! Broker trait definitions.

use crate::error::BrokerError;
use crate::types::{AccountSnapshot, Order, OrderRequest, PositionSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read side of the brokerage: balance, open positions and fill history.
#[async_trait]
pub trait AccountGateway: Send + Sync {
    /// Get the available balance and account status.
    async fn get_account(&self) -> Result<AccountSnapshot, BrokerError>;

    /// Get the open position for a symbol.
    ///
    /// # Returns
    /// The position if one exists, None when the broker reports no position
    async fn get_position(&self, symbol: &str) -> Result<Option<PositionSnapshot>, BrokerError>;

    /// Get the fill time of the most recent filled buy for a symbol.
    async fn last_filled_buy(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, BrokerError>;

    /// Get the broker name.
    fn name(&self) -> &str;
}

/// Write side of the brokerage: order placement.
///
/// Callers submit each decision at most once and never retry on failure.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit a new order.
    ///
    /// # Arguments
    /// * `request` - The order request to submit
    ///
    /// # Returns
    /// The broker's confirmation, or the rejection reason
    async fn submit_order(&self, request: OrderRequest) -> Result<Order, BrokerError>;
}
