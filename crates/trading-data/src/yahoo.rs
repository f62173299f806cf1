//! Yahoo Finance daily bars.
//!
//! Uses the v8 chart API. Transient failures (connection errors, timeouts,
//! rate limiting) are retried with exponential backoff. Unknown symbols and
//! malformed responses fail immediately.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use trading_core::error::DataError;
use trading_core::traits::DataSource;
use trading_core::types::{Bar, PriceSeries};

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance data source.
pub struct YahooDataSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooDataSource {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self, DataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
            max_retries,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Point at a different host (mirrors, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Base delay for the exponential backoff between retries.
    pub fn with_retry_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `attempt + 1`.
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Yahoo uses `-` where exchanges use `.` for share classes.
    pub fn normalize_symbol(symbol: &str) -> String {
        symbol.trim().to_uppercase().replace('.', "-")
    }

    /// Calendar window wide enough to cover `lookback` trading days.
    fn date_range(lookback: usize) -> (NaiveDate, NaiveDate) {
        let end = Utc::now().date_naive();
        let calendar_days = (lookback as i64 * 7) / 5 + 10;
        (end - ChronoDuration::days(calendar_days), end)
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()).unwrap_or(0);
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(start_ts);
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url, symbol, start_ts, end_ts
        )
    }

    /// Turn a chart response into a validated series.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<PriceSeries, DataError> {
        let result = match resp.chart.result {
            Some(result) => result,
            None => {
                return Err(match resp.chart.error {
                    Some(err) if err.code == "Not Found" => {
                        DataError::SymbolNotFound(symbol.to_string())
                    }
                    Some(err) => {
                        DataError::ParseError(format!("{}: {}", err.code, err.description))
                    }
                    None => DataError::ParseError("empty result with no error".into()),
                })
            }
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ParseError("result array is empty".into()))?;

        let timestamps = data.timestamp.unwrap_or_default();

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ParseError("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| DataError::ParseError(format!("invalid timestamp: {}", ts)))?;

            // Rows without a close are holidays or halted sessions
            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            let open = quote.open.get(i).copied().flatten().unwrap_or(close);
            let high = quote.high.get(i).copied().flatten().unwrap_or(close);
            let low = quote.low.get(i).copied().flatten().unwrap_or(close);
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);

            bars.push(Bar::new(date, open, high, low, close, volume as f64));
        }

        if bars.is_empty() {
            return Err(DataError::NoDataAvailable);
        }

        PriceSeries::from_unsorted(symbol, bars)
    }

    async fn fetch_once(&self, url: &str, symbol: &str) -> Result<PriceSeries, DataError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DataError::Timeout {
                    symbol: symbol.to_string(),
                    secs: self.timeout.as_secs(),
                }
            } else {
                DataError::ConnectionError(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        if status.is_server_error() {
            return Err(DataError::ConnectionError(format!("HTTP {} for {}", status, symbol)));
        }
        if !status.is_success() {
            return Err(DataError::Internal(format!("HTTP {} for {}", status, symbol)));
        }

        let chart: ChartResponse = resp.json().await.map_err(|e| {
            DataError::ParseError(format!("failed to parse response for {}: {}", symbol, e))
        })?;

        Self::parse_response(symbol, chart)
    }
}

#[async_trait]
impl DataSource for YahooDataSource {
    async fn get_daily_bars(&self, symbol: &str, lookback: usize) -> Result<PriceSeries, DataError> {
        let remote_symbol = Self::normalize_symbol(symbol);
        let (start, end) = Self::date_range(lookback);
        let url = self.chart_url(&remote_symbol, start, end);

        let mut attempt = 0;
        loop {
            match self.fetch_once(&url, symbol).await {
                Ok(series) => {
                    debug!(symbol = %symbol, bars = series.len(), "Fetched from Yahoo");
                    return Ok(series.truncate_to_last(lookback));
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        symbol = %symbol,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Every attempt at its own timeout plus every backoff sleep, with one
    /// base delay of slack so the caller's deadline outlasts the last attempt.
    fn fetch_budget(&self) -> Option<Duration> {
        let attempts = self.timeout.saturating_mul(self.max_retries.saturating_add(1));
        // base * (1 + 2 + ... + 2^(n-1))
        let sleeps = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(self.max_retries).saturating_sub(1));
        Some(attempts.saturating_add(sleeps).saturating_add(self.base_delay))
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned reply per connection, in order. Connections past the
    /// end of `replies` are accepted and left hanging.
    async fn serve(replies: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();

        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let Some(&(status, body)) = replies.get(n) else {
                    held.push(socket);
                    continue;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => request.extend_from_slice(&buf[..read]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), connections)
    }

    fn source(base_url: &str, timeout: Duration, max_retries: u32) -> YahooDataSource {
        YahooDataSource::new(timeout, max_retries)
            .unwrap()
            .with_base_url(base_url)
            .with_retry_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_timeouts_are_retried_until_exhausted() {
        let (url, connections) = serve(Vec::new()).await;
        let yahoo = source(&url, Duration::from_millis(200), 2);

        let result = yahoo.get_daily_bars("AAPL", 250).await;

        assert!(matches!(result, Err(DataError::Timeout { .. })));
        assert_eq!(connections.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_server_error_then_success() {
        let (url, connections) = serve(vec![(503, ""), (200, SAMPLE)]).await;
        let yahoo = source(&url, Duration::from_secs(5), 2);

        let series = yahoo.get_daily_bars("AAPL", 250).await.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let (url, connections) = serve(vec![(404, ""), (200, SAMPLE)]).await;
        let yahoo = source(&url, Duration::from_secs(5), 2);

        let result = yahoo.get_daily_bars("ZZZZ", 250).await;

        assert!(matches!(result, Err(DataError::SymbolNotFound(_))));
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fetch_budget_covers_every_attempt() {
        let yahoo = YahooDataSource::new(Duration::from_secs(1), 2).unwrap();
        // 3 attempts, 0.5s + 1s of backoff, 0.5s slack
        assert_eq!(yahoo.fetch_budget(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_backoff_saturates() {
        let yahoo = YahooDataSource::new(Duration::from_secs(1), u32::MAX).unwrap();
        assert_eq!(yahoo.backoff(1), Duration::from_secs(1));
        assert_eq!(yahoo.backoff(40), yahoo.backoff(32));
        assert!(yahoo.fetch_budget().unwrap() > Duration::from_secs(1_000_000));
    }

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open": [185.0, null, 182.0],
                        "high": [186.0, null, 183.5],
                        "low": [183.0, null, 180.9],
                        "close": [185.6, null, 181.9],
                        "volume": [82488700, null, 71983600]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_response_skips_empty_rows() {
        let resp: ChartResponse = serde_json::from_str(SAMPLE).unwrap();
        let series = YahooDataSource::parse_response("AAPL", resp).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![185.6, 181.9]);
        assert_eq!(
            series.bars()[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_parse_not_found() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            YahooDataSource::parse_response("ZZZZ", resp),
            Err(DataError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(YahooDataSource::normalize_symbol("brk.b"), "BRK-B");
        assert_eq!(YahooDataSource::normalize_symbol(" AAPL "), "AAPL");
    }

    #[test]
    fn test_date_range_covers_lookback() {
        let (start, end) = YahooDataSource::date_range(250);
        assert!((end - start).num_days() >= 350);
    }

    #[test]
    fn test_chart_url() {
        let source = YahooDataSource::new(Duration::from_secs(5), 0)
            .unwrap()
            .with_base_url("http://localhost:9999/");
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let url = source.chart_url("AAPL", day, day);
        assert!(url.starts_with("http://localhost:9999/v8/finance/chart/AAPL?period1=1704153600"));
        assert!(url.ends_with("&interval=1d"));
    }
}
