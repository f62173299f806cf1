//! Alpaca broker integration for paper and live trading.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trading_core::error::BrokerError;
use trading_core::traits::{AccountGateway, OrderGateway};
use trading_core::types::{
    AccountSnapshot, Order, OrderRequest, OrderStatus, PositionSnapshot, Side,
};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_KEY_VAR: &str = "APCA_API_KEY_ID";
pub const DEFAULT_SECRET_VAR: &str = "APCA_API_SECRET_KEY";

/// Alpaca API configuration.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub api_secret: String,
    pub paper: bool,
    /// Overrides the paper/live host when set
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl AlpacaConfig {
    /// Create config directly with key and secret.
    pub fn new(api_key: String, api_secret: String, paper: bool) -> Self {
        Self {
            api_key,
            api_secret,
            paper,
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Load credentials from the named environment variables.
    pub fn from_env(key_var: &str, secret_var: &str, paper: bool) -> Result<Self, BrokerError> {
        let api_key = std::env::var(key_var)
            .map_err(|_| BrokerError::Configuration(format!("{} not set", key_var)))?;
        let api_secret = std::env::var(secret_var)
            .map_err(|_| BrokerError::Configuration(format!("{} not set", secret_var)))?;

        Ok(Self::new(api_key, api_secret, paper))
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.base_url {
            return url;
        }
        if self.paper {
            "https://paper-api.alpaca.markets"
        } else {
            "https://api.alpaca.markets"
        }
    }
}

/// Alpaca API response types
#[derive(Debug, Deserialize)]
struct AlpacaAccount {
    status: String,
    cash: Option<String>,
    buying_power: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaPosition {
    qty: String,
    avg_entry_price: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaOrder {
    id: String,
    status: String,
    symbol: String,
    qty: Option<String>,
    filled_qty: String,
    side: String,
    filled_avg_price: Option<String>,
    created_at: String,
    filled_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    symbol: String,
    qty: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    time_in_force: String,
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, BrokerError> {
    value
        .parse()
        .map_err(|_| BrokerError::ApiError(format!("invalid {}: {:?}", field, value)))
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Map a non-success response onto the broker error taxonomy.
fn map_status(status: StatusCode, body: &str, retry_after: Option<u64>, on_order: bool) -> BrokerError {
    let detail = format!("{}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            if !(on_order && body.to_lowercase().contains("insufficient")) =>
        {
            BrokerError::AuthenticationError(detail)
        }
        StatusCode::TOO_MANY_REQUESTS => BrokerError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(60),
        },
        _ if on_order && body.to_lowercase().contains("insufficient") => {
            BrokerError::InsufficientBuyingPower(detail)
        }
        StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY if on_order => {
            BrokerError::InvalidSymbol(detail)
        }
        _ if on_order => BrokerError::OrderRejected(detail),
        _ => BrokerError::ApiError(detail),
    }
}

/// Newest filled buy for `symbol` among `orders`.
fn newest_filled_buy(orders: &[AlpacaOrder], symbol: &str) -> Option<DateTime<Utc>> {
    orders
        .iter()
        .filter(|o| o.side == "buy" && o.symbol.eq_ignore_ascii_case(symbol))
        .filter_map(|o| o.filled_at.as_deref().and_then(parse_time))
        .max()
}

impl AlpacaAccount {
    /// Cash, falling back to buying power.
    fn snapshot(self) -> Result<AccountSnapshot, BrokerError> {
        let balance = match (self.cash.as_deref(), self.buying_power.as_deref()) {
            (Some(cash), _) => parse_decimal("cash", cash)?,
            (None, Some(bp)) => parse_decimal("buying_power", bp)?,
            (None, None) => {
                return Err(BrokerError::ApiError(
                    "account has neither cash nor buying_power".into(),
                ))
            }
        };
        Ok(AccountSnapshot::new(balance, self.status))
    }
}

impl AlpacaOrder {
    fn into_order(self) -> Result<Order, BrokerError> {
        let side = match self.side.as_str() {
            "buy" => Side::Buy,
            "sell" => Side::Sell,
            _ => return Err(BrokerError::ApiError(format!("Unknown side: {}", self.side))),
        };

        let filled_quantity = parse_decimal("filled_qty", &self.filled_qty)?;
        let quantity = match self.qty.as_deref() {
            Some(qty) => parse_decimal("qty", qty)?,
            None => filled_quantity,
        };

        Ok(Order {
            id: Uuid::parse_str(&self.id).unwrap_or_else(|_| Uuid::new_v4()),
            symbol: self.symbol,
            side,
            quantity,
            status: OrderStatus::from_broker(&self.status),
            filled_quantity,
            filled_avg_price: self.filled_avg_price.as_deref().and_then(|p| p.parse().ok()),
            created_at: parse_time(&self.created_at).unwrap_or_else(Utc::now),
            filled_at: self.filled_at.as_deref().and_then(parse_time),
        })
    }
}

/// Alpaca broker client.
pub struct AlpacaBroker {
    config: AlpacaConfig,
    client: Client,
}

impl AlpacaBroker {
    /// Create a new Alpaca broker client.
    pub fn new(config: AlpacaConfig) -> Result<Self, BrokerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            header::HeaderValue::from_str(&config.api_key)
                .map_err(|e| BrokerError::Configuration(e.to_string()))?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            header::HeaderValue::from_str(&config.api_secret)
                .map_err(|e| BrokerError::Configuration(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    fn transport_error(operation: &str, timeout: Duration, e: reqwest::Error) -> BrokerError {
        if e.is_timeout() {
            BrokerError::Timeout {
                operation: operation.to_string(),
                secs: timeout.as_secs(),
            }
        } else {
            BrokerError::Connection(e.to_string())
        }
    }

    async fn error_from(resp: reqwest::Response, on_order: bool) -> BrokerError {
        let status = resp.status();
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let text = resp.text().await.unwrap_or_default();
        map_status(status, &text, retry_after, on_order)
    }
}

#[async_trait]
impl AccountGateway for AlpacaBroker {
    async fn get_account(&self) -> Result<AccountSnapshot, BrokerError> {
        let resp = self
            .client
            .get(self.url("/v2/account"))
            .send()
            .await
            .map_err(|e| Self::transport_error("get_account", self.config.timeout, e))?;

        if !resp.status().is_success() {
            return Err(Self::error_from(resp, false).await);
        }

        let account: AlpacaAccount = resp
            .json()
            .await
            .map_err(|e| BrokerError::ApiError(e.to_string()))?;
        let snapshot = account.snapshot()?;
        debug!(balance = %snapshot.balance, status = %snapshot.status, "Fetched account");
        Ok(snapshot)
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<PositionSnapshot>, BrokerError> {
        let resp = self
            .client
            .get(self.url(&format!("/v2/positions/{}", symbol)))
            .send()
            .await
            .map_err(|e| Self::transport_error("get_position", self.config.timeout, e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            return Err(Self::error_from(resp, false).await);
        }

        let p: AlpacaPosition = resp
            .json()
            .await
            .map_err(|e| BrokerError::ApiError(e.to_string()))?;
        Ok(Some(PositionSnapshot::new(
            parse_decimal("qty", &p.qty)?,
            parse_decimal("avg_entry_price", &p.avg_entry_price)?,
        )))
    }

    async fn last_filled_buy(&self, symbol: &str) -> Result<Option<DateTime<Utc>>, BrokerError> {
        let resp = self
            .client
            .get(self.url("/v2/orders"))
            .query(&[
                ("status", "closed"),
                ("side", "buy"),
                ("symbols", symbol),
                ("limit", "100"),
                ("direction", "desc"),
            ])
            .send()
            .await
            .map_err(|e| Self::transport_error("last_filled_buy", self.config.timeout, e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            return Err(Self::error_from(resp, false).await);
        }

        let orders: Vec<AlpacaOrder> = resp
            .json()
            .await
            .map_err(|e| BrokerError::ApiError(e.to_string()))?;
        Ok(newest_filled_buy(&orders, symbol))
    }

    fn name(&self) -> &str {
        if self.config.paper {
            "Alpaca Paper"
        } else {
            "Alpaca Live"
        }
    }
}

#[async_trait]
impl OrderGateway for AlpacaBroker {
    async fn submit_order(&self, request: OrderRequest) -> Result<Order, BrokerError> {
        let create_req = CreateOrderRequest {
            symbol: request.symbol.clone(),
            qty: request.quantity.to_string(),
            side: request.side.as_str().to_string(),
            order_type: request.order_type.as_str().to_string(),
            time_in_force: request.time_in_force.as_str().to_string(),
        };

        debug!("Submitting order: {:?}", create_req);

        let resp = self
            .client
            .post(self.url("/v2/orders"))
            .json(&create_req)
            .send()
            .await
            .map_err(|e| Self::transport_error("submit_order", self.config.timeout, e))?;

        if !resp.status().is_success() {
            return Err(Self::error_from(resp, true).await);
        }

        let order: AlpacaOrder = resp
            .json()
            .await
            .map_err(|e| BrokerError::ApiError(e.to_string()))?;

        info!(
            "Order submitted: {} {} {} ({})",
            order.side,
            order.qty.as_deref().unwrap_or("?"),
            order.symbol,
            order.status
        );
        order.into_order()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order_json(side: &str, symbol: &str, filled_at: Option<&str>) -> String {
        let filled_at = filled_at
            .map(|t| format!("\"{}\"", t))
            .unwrap_or_else(|| "null".to_string());
        format!(
            r#"{{"id":"61e69015-8549-4bfd-b9c3-01e75843f47d","status":"filled","symbol":"{}",
               "qty":"4","filled_qty":"4","type":"market","side":"{}","time_in_force":"gtc",
               "filled_avg_price":"45.12","created_at":"2024-03-01T14:30:00Z","filled_at":{}}}"#,
            symbol, side, filled_at
        )
    }

    #[test]
    fn test_balance_prefers_cash() {
        let account: AlpacaAccount =
            serde_json::from_str(r#"{"status":"ACTIVE","cash":"1500.25","buying_power":"3000"}"#)
                .unwrap();
        let snapshot = account.snapshot().unwrap();
        assert_eq!(snapshot.balance, dec!(1500.25));
        assert!(snapshot.is_active());
    }

    #[test]
    fn test_balance_falls_back_to_buying_power() {
        let account: AlpacaAccount =
            serde_json::from_str(r#"{"status":"ACTIVE","buying_power":"3000"}"#).unwrap();
        assert_eq!(account.snapshot().unwrap().balance, dec!(3000));

        let account: AlpacaAccount = serde_json::from_str(r#"{"status":"ACTIVE"}"#).unwrap();
        assert!(account.snapshot().is_err());
    }

    #[test]
    fn test_parse_order() {
        let raw: AlpacaOrder =
            serde_json::from_str(&order_json("buy", "AAPL", Some("2024-03-01T14:30:05Z"))).unwrap();
        let order = raw.into_order().unwrap();
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.quantity, dec!(4));
        assert_eq!(order.filled_avg_price, Some(dec!(45.12)));
        assert!(order.filled_at.is_some());
    }

    #[test]
    fn test_newest_filled_buy() {
        let orders: Vec<AlpacaOrder> = vec![
            serde_json::from_str(&order_json("buy", "AAPL", Some("2024-03-01T14:30:05Z"))).unwrap(),
            serde_json::from_str(&order_json("sell", "AAPL", Some("2024-04-01T14:30:05Z"))).unwrap(),
            serde_json::from_str(&order_json("buy", "AAPL", Some("2024-03-15T14:30:05Z"))).unwrap(),
            serde_json::from_str(&order_json("buy", "AAPL", None)).unwrap(),
            serde_json::from_str(&order_json("buy", "MSFT", Some("2024-05-01T14:30:05Z"))).unwrap(),
        ];

        let newest = newest_filled_buy(&orders, "AAPL").unwrap();
        assert_eq!(newest, parse_time("2024-03-15T14:30:05Z").unwrap());
        assert!(newest_filled_buy(&orders, "TSLA").is_none());
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "unauthorized", None, false),
            BrokerError::AuthenticationError(_)
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, "insufficient buying power", None, true),
            BrokerError::InsufficientBuyingPower(_)
        ));
        assert!(matches!(
            map_status(StatusCode::UNPROCESSABLE_ENTITY, "asset not found", None, true),
            BrokerError::InvalidSymbol(_)
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, "", Some(5), true),
            BrokerError::RateLimited { retry_after_secs: 5 }
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, "market closed", None, true),
            BrokerError::OrderRejected(_)
        ));
        assert!(matches!(
            map_status(StatusCode::INTERNAL_SERVER_ERROR, "oops", None, false),
            BrokerError::ApiError(_)
        ));
    }

    #[test]
    fn test_base_url_override() {
        let config = AlpacaConfig::new("k".into(), "s".into(), true)
            .with_base_url(Some("http://localhost:8080/".into()));
        assert_eq!(config.base_url(), "http://localhost:8080");

        let live = AlpacaConfig::new("k".into(), "s".into(), false);
        assert_eq!(live.base_url(), "https://api.alpaca.markets");
    }
}
