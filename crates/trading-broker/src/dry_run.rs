//! Order gateway that records orders without sending them anywhere.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::info;
use trading_core::error::BrokerError;
use trading_core::traits::OrderGateway;
use trading_core::types::{Order, OrderRequest};

/// Accepts every order and keeps it in memory.
#[derive(Clone, Default)]
pub struct DryRunOrders {
    submitted: Arc<Mutex<Vec<OrderRequest>>>,
}

impl DryRunOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders that would have been placed.
    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[async_trait]
impl OrderGateway for DryRunOrders {
    async fn submit_order(&self, request: OrderRequest) -> Result<Order, BrokerError> {
        info!(
            symbol = %request.symbol,
            side = %request.side,
            quantity = %request.quantity,
            "[dry-run] order not sent"
        );
        let order = Order::from_request(&request);
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trading_core::types::{OrderStatus, Side};

    #[tokio::test]
    async fn test_records_without_filling() {
        let gateway = DryRunOrders::new();
        let order = gateway
            .submit_order(OrderRequest::market("AAPL", Side::Buy, dec!(3)))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(gateway.submitted().len(), 1);
        assert_eq!(gateway.submitted()[0].quantity, dec!(3));
    }
}
