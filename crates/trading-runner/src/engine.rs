//! Daily run engine.
//!
//! One run walks the instrument universe in order: fetch or reuse the price
//! series, enrich it, evaluate, and place at most one order per symbol. The
//! cache is loaded once, threaded through every symbol and persisted once at
//! the end.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use trading_core::error::{BrokerError, DataError, TradingError};
use trading_core::traits::{AccountGateway, DataSource, Notifier, OrderGateway, UniverseSource};
use trading_core::types::{AccountSnapshot, DecisionReason, Evaluation, TradeDecision};
use trading_data::{CacheFile, CacheLookup, CacheStore, SymbolFilter};
use trading_indicators::enrich;
use trading_monitor::LogNotifier;
use trading_strategies::{HoldingState, PositionSource, SignalEvaluator};

use crate::report::{RunReport, SymbolOutcome};

const BALANCE_ALERT: &str = "Account balance is negative or zero, stopping execution.";

/// Run settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Trailing bars requested per symbol
    pub lookback: usize,
    /// Upper bound on every fetch, account, position and order call
    pub call_timeout: Duration,
    /// Write the cache after every remote fetch as well as at the end
    pub persist_after_fetch: bool,
    /// Lock and persist the cache file at all (off for dry runs)
    pub persist: bool,
    /// Process at most this many symbols
    pub max_symbols: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lookback: 250,
            call_timeout: Duration::from_secs(30),
            persist_after_fetch: false,
            persist: true,
            max_symbols: None,
        }
    }
}

/// Wall-clock instant and cache epoch for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    pub now: DateTime<Utc>,
    pub epoch: NaiveDate,
}

impl RunClock {
    /// Current time, with the epoch taken from the local calendar date.
    pub fn system() -> Self {
        Self {
            now: Utc::now(),
            epoch: Local::now().date_naive(),
        }
    }

    pub fn at(now: DateTime<Utc>, epoch: NaiveDate) -> Self {
        Self { now, epoch }
    }
}

/// Run orchestrator.
pub struct DailyRunner {
    data: Arc<dyn DataSource>,
    account: Arc<dyn AccountGateway>,
    orders: Arc<dyn OrderGateway>,
    notifier: Arc<dyn Notifier>,
    evaluator: SignalEvaluator,
    cache: CacheFile,
    filter: SymbolFilter,
    config: RunConfig,
}

impl DailyRunner {
    /// Create a runner that notifies through the log.
    pub fn new(
        data: Arc<dyn DataSource>,
        account: Arc<dyn AccountGateway>,
        orders: Arc<dyn OrderGateway>,
        evaluator: SignalEvaluator,
        cache: CacheFile,
    ) -> Self {
        Self {
            data,
            account,
            orders,
            notifier: Arc::new(LogNotifier),
            evaluator,
            cache,
            filter: SymbolFilter::default(),
            config: RunConfig::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_filter(mut self, filter: SymbolFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run once over `universe`.
    ///
    /// Errors returned here are fatal: the universe could not be read, the
    /// cache could not be locked, read or written, or the broker refused our
    /// credentials. Anything scoped to a single symbol is recorded in the
    /// report instead.
    pub async fn run(
        &self,
        universe: &dyn UniverseSource,
        clock: RunClock,
    ) -> Result<RunReport, TradingError> {
        let mut report = RunReport::new(clock.epoch, clock.now);

        let raw = universe.symbols().await?;
        let mut symbols = self.filter.apply(raw);
        if let Some(max) = self.config.max_symbols {
            symbols.truncate(max);
        }
        info!(
            universe = universe.name(),
            symbols = symbols.len(),
            epoch = %clock.epoch,
            "Starting daily run"
        );

        let _lock = if self.config.persist {
            Some(self.cache.lock()?)
        } else {
            None
        };

        let stored = if self.config.persist {
            self.cache.load()?
        } else {
            self.cache.load_read_only()?
        };
        report.cache_reset = stored
            .as_ref()
            .is_some_and(|store| store.epoch() != clock.epoch);
        let mut store = CacheStore::reset_if_stale(stored, clock.epoch);

        match self.fetch_account().await {
            Ok(account) => info!(
                broker = self.account.name(),
                balance = %account.balance,
                status = %account.status,
                "Account ready"
            ),
            Err(e) => {
                let e = TradingError::from(e);
                if e.is_fatal() {
                    error!(error = %e, "Account check failed, aborting before any orders");
                    return Err(e);
                }
                warn!(error = %e, "Account check failed, continuing");
            }
        }

        for symbol in symbols {
            match self.process_symbol(&symbol, &mut store, &mut report, clock).await {
                Ok(outcome) => report.record(symbol, outcome),
                Err(e) if e.is_fatal() => {
                    error!(symbol = %symbol, error = %e, "Fatal error, aborting run");
                    if self.config.persist {
                        if let Err(persist_err) = self.cache.persist(&store) {
                            warn!(error = %persist_err, "Could not persist cache after fatal error");
                        }
                    }
                    return Err(e);
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Skipping symbol");
                    report.record(
                        symbol,
                        SymbolOutcome::Skipped {
                            error: e.to_string(),
                        },
                    );
                }
            }
        }

        if self.config.persist {
            self.cache.persist(&store)?;
        }

        report.finish(Utc::now());
        let counts = report.counts();
        info!(
            bought = counts.bought,
            sold = counts.sold,
            held = counts.held,
            order_failed = counts.order_failed,
            skipped = counts.skipped,
            "Daily run complete"
        );
        Ok(report)
    }

    async fn process_symbol(
        &self,
        symbol: &str,
        store: &mut CacheStore,
        report: &mut RunReport,
        clock: RunClock,
    ) -> Result<SymbolOutcome, TradingError> {
        let secs = self.config.call_timeout.as_secs();

        let fetch_limit = self.fetch_limit();
        let (series, lookup) = bounded(
            fetch_limit,
            store.get_or_fetch(symbol, self.data.as_ref(), self.config.lookback),
            || DataError::Timeout {
                symbol: symbol.to_string(),
                secs: fetch_limit.as_secs(),
            },
        )
        .await?;

        match lookup {
            CacheLookup::Hit => report.cache_hits += 1,
            CacheLookup::Miss => {
                report.fetches += 1;
                if self.config.persist && self.config.persist_after_fetch {
                    self.cache.persist(store)?;
                }
            }
        }

        let frame = enrich(&series, &self.evaluator.config().indicator_params());
        if let Err(hold) = self.evaluator.check_history(symbol, &frame) {
            debug!(symbol = %symbol, reason = %hold.reason, "Hold");
            return Ok(SymbolOutcome::Held {
                reason: hold.reason,
            });
        }

        let account = self.fetch_account().await?;
        let holding = match self.evaluator.config().position_source {
            PositionSource::Gateway => {
                let position = bounded(
                    self.config.call_timeout,
                    self.account.get_position(symbol),
                    || broker_timeout("get position", symbol, secs),
                )
                .await?;
                let last_buy = bounded(
                    self.config.call_timeout,
                    self.account.last_filled_buy(symbol),
                    || broker_timeout("last filled buy", symbol, secs),
                )
                .await?;
                HoldingState::from_gateway(position, last_buy)
            }
            PositionSource::Cache => HoldingState::from_trade_metadata(store.trade(symbol)),
        };

        let evaluation = self
            .evaluator
            .evaluate(symbol, &frame, &account, &holding, clock.now);

        if evaluation.reason == DecisionReason::NonPositiveBalance && !report.account_alert {
            report.account_alert = true;
            warn!(balance = %account.balance, status = %account.status, "Account balance not positive");
            self.notify(BALANCE_ALERT).await;
        }

        let close = frame.latest().map(|row| row.close);
        self.act(symbol, evaluation, close, store, clock).await
    }

    async fn act(
        &self,
        symbol: &str,
        evaluation: Evaluation,
        close: Option<f64>,
        store: &mut CacheStore,
        clock: RunClock,
    ) -> Result<SymbolOutcome, TradingError> {
        let Some(request) = evaluation.decision.order_request(symbol) else {
            debug!(symbol = %symbol, reason = %evaluation.reason, "Hold");
            return Ok(SymbolOutcome::Held {
                reason: evaluation.reason,
            });
        };

        let side = request.side;
        let quantity = request.quantity;
        let short_term = evaluation.is_short_term_sale();
        info!(
            symbol = %symbol,
            side = %side,
            quantity = %quantity,
            reason = %evaluation.reason,
            "Submitting order"
        );

        let submitted = bounded(
            self.config.call_timeout,
            self.orders.submit_order(request),
            || broker_timeout("submit order", symbol, self.config.call_timeout.as_secs()),
        )
        .await;

        let order = match submitted {
            Ok(order) => order,
            Err(e) => {
                let e = TradingError::from(e);
                if e.is_fatal() {
                    return Err(e);
                }
                warn!(symbol = %symbol, side = %side, error = %e, "Order failed");
                return Ok(SymbolOutcome::OrderFailed {
                    side,
                    quantity,
                    error: e.to_string(),
                });
            }
        };

        let price = order
            .filled_avg_price
            .or_else(|| close.and_then(|c| Decimal::try_from(c).ok()));
        if !store.record_trade(symbol, side, quantity, price, clock.now) {
            warn!(symbol = %symbol, "No cache entry to record trade against");
        }

        let outcome = match evaluation.decision {
            TradeDecision::Buy(_) => {
                self.notify(&format!(
                    "Buy order placed for {}: {} shares.",
                    symbol, quantity
                ))
                .await;
                SymbolOutcome::Bought { quantity }
            }
            _ => {
                let mut message = format!("Sell order placed for {}: {} shares.", symbol, quantity);
                if short_term {
                    message.push_str(&format!(
                        " Warning: selling {} will trigger short-term capital gains.",
                        symbol
                    ));
                }
                self.notify(&message).await;
                SymbolOutcome::Sold {
                    quantity,
                    short_term,
                }
            }
        };

        info!(symbol = %symbol, order_id = %order.id, status = ?order.status, "Order placed");
        Ok(outcome)
    }

    /// Deadline for one fetch: the call timeout, stretched to cover the
    /// source's own retries.
    fn fetch_limit(&self) -> Duration {
        self.data
            .fetch_budget()
            .map_or(self.config.call_timeout, |budget| {
                budget.max(self.config.call_timeout)
            })
    }

    async fn fetch_account(&self) -> Result<AccountSnapshot, BrokerError> {
        bounded(self.config.call_timeout, self.account.get_account(), || {
            BrokerError::Timeout {
                operation: "get account".to_string(),
                secs: self.config.call_timeout.as_secs(),
            }
        })
        .await
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self.notifier.send(message).await {
            warn!(notifier = self.notifier.name(), error = %e, "Notification failed");
        }
    }
}

fn broker_timeout(operation: &str, symbol: &str, secs: u64) -> BrokerError {
    BrokerError::Timeout {
        operation: format!("{} {}", operation, symbol),
        secs,
    }
}

/// Await `fut`, turning an elapsed deadline into the caller's error.
async fn bounded<T, E, F>(limit: Duration, fut: F, elapsed: impl FnOnce() -> E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(elapsed()),
    }
}
