//! Signal evaluator: MA trend filter with RSI entries and exits.
//!
//! Rules are checked in order against the latest bar of an
//! [`IndicatorFrame`]:
//!
//! 1. Too little history, or an undefined indicator: hold.
//! 2. Non-positive balance: hold (the caller raises the account alert).
//! 3. A filled buy inside the cooldown window: hold.
//! 4. Short MA above long MA, RSI oversold, nothing held: buy a
//!    `risk_fraction` slice of the balance, or hold if that is zero shares.
//! 5. Short MA below long MA, RSI overbought, shares held: sell all of them,
//!    flagging a short-term sale when held under the long-term threshold.
//! 6. Otherwise hold.
//!
//! Evaluation is pure. Placing orders, sending notifications and updating
//! cached trade metadata are left to the caller.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use trading_core::{
    error::StrategyError,
    traits::StrategyConfig,
    types::{AccountSnapshot, Advisory, DecisionReason, Evaluation, TradeDecision},
};
use trading_indicators::IndicatorFrame;
use trading_risk::{CooldownGate, HoldingPeriod, PositionSizer};

use crate::{HoldingState, SignalConfig};

/// Produces one [`Evaluation`] per symbol per run.
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    config: SignalConfig,
    sizer: PositionSizer,
    cooldown: CooldownGate,
    holding_period: HoldingPeriod,
}

impl SignalEvaluator {
    /// Create an evaluator, validating the configuration first.
    pub fn new(config: SignalConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self {
            sizer: PositionSizer::from_fraction(config.risk_fraction),
            cooldown: CooldownGate::new(config.cooldown_hours),
            holding_period: HoldingPeriod::new(config.long_term_hold_days),
            config,
        })
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Hold for insufficient history, or the latest indicator values when
    /// every one is defined.
    pub fn check_history(
        &self,
        symbol: &str,
        frame: &IndicatorFrame,
    ) -> Result<(f64, f64, f64, f64), Evaluation> {
        let insufficient = || {
            Evaluation::hold(
                symbol,
                DecisionReason::InsufficientData {
                    bars: frame.len(),
                    required: self.config.long_window,
                },
            )
        };

        if frame.len() < self.config.long_window {
            return Err(insufficient());
        }
        let latest = frame.latest().ok_or_else(insufficient)?;
        let (rsi, short_ma, long_ma) = latest.indicators().ok_or_else(insufficient)?;
        Ok((latest.close, rsi, short_ma, long_ma))
    }

    /// Decide what to do with `symbol` at `now`.
    pub fn evaluate(
        &self,
        symbol: &str,
        frame: &IndicatorFrame,
        account: &AccountSnapshot,
        holding: &HoldingState,
        now: DateTime<Utc>,
    ) -> Evaluation {
        let (close, rsi, short_ma, long_ma) = match self.check_history(symbol, frame) {
            Ok(values) => values,
            Err(hold) => return hold,
        };

        if !account.is_funded() {
            return Evaluation::hold(symbol, DecisionReason::NonPositiveBalance);
        }

        if let Some(remaining) = self.cooldown.remaining(holding.last_buy_at, now) {
            // Round up so a partially elapsed hour still reads as remaining
            let hours_remaining = (remaining.num_minutes() + 59) / 60;
            debug!(symbol = %symbol, hours_remaining, "Cooldown active");
            return Evaluation::hold(symbol, DecisionReason::CooldownActive { hours_remaining });
        }

        let held = holding.held_quantity();

        if short_ma > long_ma && rsi < self.config.oversold && held == Decimal::ZERO {
            let shares = self.sizer.shares_for_close(account.balance, close);
            if shares <= Decimal::ZERO {
                debug!(symbol = %symbol, close, "Entry signal but zero shares affordable");
                return Evaluation::hold(symbol, DecisionReason::InsufficientFunds);
            }
            return Evaluation {
                symbol: symbol.to_string(),
                decision: TradeDecision::Buy(shares),
                reason: DecisionReason::EntrySignal { rsi, short_ma, long_ma },
                advisories: Vec::new(),
            };
        }

        if short_ma < long_ma && rsi > self.config.overbought && held > Decimal::ZERO {
            let mut advisories = Vec::new();
            if self.holding_period.is_short_term(holding.purchased_at, now) {
                advisories.push(Advisory::ShortTermGains {
                    held_days: holding
                        .purchased_at
                        .map(|at| HoldingPeriod::held_days(at, now)),
                });
            }
            return Evaluation {
                symbol: symbol.to_string(),
                decision: TradeDecision::Sell(held),
                reason: DecisionReason::ExitSignal { rsi, short_ma, long_ma },
                advisories,
            };
        }

        Evaluation::hold(symbol, DecisionReason::NoSignal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PositionSource;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;
    use trading_core::types::{Bar, PositionSnapshot, PriceSeries, TradeMetadata};
    use trading_indicators::enrich;

    /// Frame of `len` bars whose latest row carries the given values.
    fn frame_with(len: usize, close: f64, rsi: f64, short_ma: f64, long_ma: f64) -> IndicatorFrame {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let dates = (0..len).map(|i| start + Duration::days(i as i64)).collect();
        let closes = vec![close; len];
        let mut rsi_col = vec![None; len];
        let mut short_col = vec![None; len];
        let mut long_col = vec![None; len];
        if len > 0 {
            rsi_col[len - 1] = Some(rsi);
            short_col[len - 1] = Some(short_ma);
            long_col[len - 1] = Some(long_ma);
        }
        IndicatorFrame::from_columns("TEST", dates, closes, rsi_col, short_col, long_col).unwrap()
    }

    fn evaluator() -> SignalEvaluator {
        SignalEvaluator::new(SignalConfig::default()).unwrap()
    }

    fn funded(balance: Decimal) -> AccountSnapshot {
        AccountSnapshot::new(balance, "ACTIVE")
    }

    fn holding(quantity: Decimal, purchased_at: Option<DateTime<Utc>>) -> HoldingState {
        HoldingState {
            position: PositionSnapshot::new(quantity, dec!(100)),
            last_buy_at: purchased_at,
            purchased_at,
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SignalConfig::default();
        config.long_window = 10;
        assert!(SignalEvaluator::new(config).is_err());
    }

    #[test]
    fn test_short_history_holds_regardless_of_indicators() {
        let frame = frame_with(199, 45.0, 10.0, 120.0, 100.0);
        let eval = evaluator().evaluate(
            "TEST",
            &frame,
            &funded(dec!(10000)),
            &HoldingState::default(),
            Utc::now(),
        );
        assert_eq!(eval.decision, TradeDecision::Hold);
        assert_eq!(
            eval.reason,
            DecisionReason::InsufficientData { bars: 199, required: 200 }
        );
    }

    #[test]
    fn test_check_history_returns_latest_values() {
        let frame = frame_with(200, 45.0, 25.0, 120.0, 100.0);
        let (close, rsi, short_ma, long_ma) = evaluator().check_history("TEST", &frame).unwrap();
        assert_eq!((close, rsi, short_ma, long_ma), (45.0, 25.0, 120.0, 100.0));

        let short = frame_with(50, 45.0, 25.0, 120.0, 100.0);
        assert!(evaluator().check_history("TEST", &short).is_err());
    }

    #[test]
    fn test_undefined_latest_indicator_holds() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let dates = (0..200).map(|i| start + Duration::days(i)).collect();
        let mut rsi = vec![None; 200];
        rsi[199] = Some(25.0);
        let frame = IndicatorFrame::from_columns(
            "TEST",
            dates,
            vec![45.0; 200],
            rsi,
            vec![None; 200],
            vec![None; 200],
        )
        .unwrap();

        let eval = evaluator().evaluate(
            "TEST",
            &frame,
            &funded(dec!(10000)),
            &HoldingState::default(),
            Utc::now(),
        );
        assert!(matches!(eval.reason, DecisionReason::InsufficientData { .. }));
    }

    #[test]
    fn test_uptrend_oversold_buys_risk_slice() {
        let frame = frame_with(250, 45.0, 25.0, 120.0, 100.0);
        let eval = evaluator().evaluate(
            "TEST",
            &frame,
            &funded(dec!(10000)),
            &HoldingState::default(),
            Utc::now(),
        );
        // floor(0.02 * 10000 / 45) = 4
        assert_eq!(eval.decision, TradeDecision::Buy(dec!(4)));
        assert!(matches!(eval.reason, DecisionReason::EntrySignal { .. }));
        assert!(eval.advisories.is_empty());
    }

    #[test]
    fn test_non_positive_balance_holds() {
        let frame = frame_with(250, 45.0, 25.0, 120.0, 100.0);
        for balance in [dec!(0), dec!(-10)] {
            let eval = evaluator().evaluate(
                "TEST",
                &frame,
                &funded(balance),
                &HoldingState::default(),
                Utc::now(),
            );
            assert_eq!(eval.decision, TradeDecision::Hold);
            assert_eq!(eval.reason, DecisionReason::NonPositiveBalance);
        }
    }

    #[test]
    fn test_cooldown_blocks_buy() {
        let now = Utc::now();
        let frame = frame_with(250, 45.0, 25.0, 120.0, 100.0);
        let recent = holding(Decimal::ZERO, Some(now - Duration::hours(100)));

        let eval = evaluator().evaluate("TEST", &frame, &funded(dec!(10000)), &recent, now);
        assert_eq!(eval.decision, TradeDecision::Hold);
        assert_eq!(
            eval.reason,
            DecisionReason::CooldownActive { hours_remaining: 620 }
        );
    }

    #[test]
    fn test_expired_cooldown_allows_buy() {
        let now = Utc::now();
        let frame = frame_with(250, 45.0, 25.0, 120.0, 100.0);
        let old = holding(Decimal::ZERO, Some(now - Duration::hours(800)));

        let eval = evaluator().evaluate("TEST", &frame, &funded(dec!(10000)), &old, now);
        assert_eq!(eval.decision, TradeDecision::Buy(dec!(4)));
    }

    #[test]
    fn test_disabled_cooldown_allows_buy() {
        let now = Utc::now();
        let config = SignalConfig {
            cooldown_hours: 0,
            position_source: PositionSource::Cache,
            ..SignalConfig::default()
        };
        let evaluator = SignalEvaluator::new(config).unwrap();
        let frame = frame_with(250, 45.0, 25.0, 120.0, 100.0);
        let recent = holding(Decimal::ZERO, Some(now - Duration::hours(1)));

        let eval = evaluator.evaluate("TEST", &frame, &funded(dec!(10000)), &recent, now);
        assert_eq!(eval.decision, TradeDecision::Buy(dec!(4)));
    }

    #[test]
    fn test_insufficient_funds_holds() {
        let frame = frame_with(250, 500.0, 25.0, 120.0, 100.0);
        let eval = evaluator().evaluate(
            "TEST",
            &frame,
            &funded(dec!(10000)),
            &HoldingState::default(),
            Utc::now(),
        );
        assert_eq!(eval.decision, TradeDecision::Hold);
        assert_eq!(eval.reason, DecisionReason::InsufficientFunds);
    }

    #[test]
    fn test_existing_position_blocks_buy() {
        let now = Utc::now();
        let frame = frame_with(250, 45.0, 25.0, 120.0, 100.0);
        let held = holding(dec!(10), Some(now - Duration::days(60)));

        let eval = evaluator().evaluate("TEST", &frame, &funded(dec!(10000)), &held, now);
        assert_eq!(eval.decision, TradeDecision::Hold);
        assert_eq!(eval.reason, DecisionReason::NoSignal);
    }

    #[test]
    fn test_downtrend_overbought_sells_with_short_term_advisory() {
        let now = Utc::now();
        let frame = frame_with(250, 100.0, 75.0, 90.0, 110.0);
        let held = holding(dec!(50), Some(now - Duration::days(40)));

        let eval = evaluator().evaluate("TEST", &frame, &funded(dec!(10000)), &held, now);
        assert_eq!(eval.decision, TradeDecision::Sell(dec!(50)));
        assert!(eval.is_short_term_sale());
        assert_eq!(
            eval.advisories,
            vec![Advisory::ShortTermGains { held_days: Some(40) }]
        );
    }

    #[test]
    fn test_long_term_sell_has_no_advisory() {
        let now = Utc::now();
        let frame = frame_with(250, 100.0, 75.0, 90.0, 110.0);
        let held = holding(dec!(50), Some(now - Duration::days(400)));

        let eval = evaluator().evaluate("TEST", &frame, &funded(dec!(10000)), &held, now);
        assert_eq!(eval.decision, TradeDecision::Sell(dec!(50)));
        assert!(!eval.is_short_term_sale());
    }

    #[test]
    fn test_unknown_purchase_date_flags_short_term() {
        let frame = frame_with(250, 100.0, 75.0, 90.0, 110.0);
        let held = holding(dec!(50), None);

        let eval = evaluator().evaluate("TEST", &frame, &funded(dec!(10000)), &held, Utc::now());
        assert_eq!(eval.decision, TradeDecision::Sell(dec!(50)));
        assert_eq!(
            eval.advisories,
            vec![Advisory::ShortTermGains { held_days: None }]
        );
    }

    #[test]
    fn test_sell_requires_position() {
        let frame = frame_with(250, 100.0, 75.0, 90.0, 110.0);
        let eval = evaluator().evaluate(
            "TEST",
            &frame,
            &funded(dec!(10000)),
            &HoldingState::default(),
            Utc::now(),
        );
        assert_eq!(eval.decision, TradeDecision::Hold);
    }

    #[test]
    fn test_neither_condition_holds() {
        let now = Utc::now();
        let held = holding(dec!(5), Some(now - Duration::days(10)));
        // Uptrend but RSI neutral
        let frame = frame_with(250, 45.0, 50.0, 120.0, 100.0);
        let eval = evaluator().evaluate("TEST", &frame, &funded(dec!(10000)), &held, now);
        assert_eq!(eval.decision, TradeDecision::Hold);
        assert_eq!(eval.reason, DecisionReason::NoSignal);

        // Downtrend, RSI overbought, but nothing held
        let frame = frame_with(250, 45.0, 80.0, 90.0, 110.0);
        let eval = evaluator().evaluate(
            "TEST",
            &frame,
            &funded(dec!(10000)),
            &HoldingState::default(),
            now,
        );
        assert_eq!(eval.reason, DecisionReason::NoSignal);
    }

    #[test]
    fn test_cache_mode_sell_uses_metadata() {
        let now = Utc::now();
        let config = SignalConfig {
            position_source: PositionSource::Cache,
            ..SignalConfig::default()
        };
        let evaluator = SignalEvaluator::new(config).unwrap();
        let meta = TradeMetadata::opened(dec!(7), Some(dec!(90)), now - Duration::days(500));
        let state = HoldingState::from_trade_metadata(Some(&meta));

        let frame = frame_with(250, 100.0, 75.0, 90.0, 110.0);
        let eval = evaluator.evaluate("TEST", &frame, &funded(dec!(10000)), &state, now);
        assert_eq!(eval.decision, TradeDecision::Sell(dec!(7)));
        assert!(!eval.is_short_term_sale());
    }

    #[test]
    fn test_enriched_series_triggers_buy() {
        // Long climb then a two-week pullback: uptrend with RSI at zero
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars = (0..235)
            .map(|i| {
                let close = if i < 220 { 100.0 + i as f64 } else { 319.0 - (i - 219) as f64 };
                Bar::new(start + Duration::days(i as i64), close, close, close, close, 1e6)
            })
            .collect();
        let series = PriceSeries::new("DIP", bars).unwrap();
        let evaluator = evaluator();
        let frame = enrich(&series, &evaluator.config().indicator_params());

        let eval = evaluator.evaluate(
            "DIP",
            &frame,
            &funded(dec!(100000)),
            &HoldingState::default(),
            Utc::now(),
        );
        // floor(2000 / 304) = 6
        assert_eq!(eval.decision, TradeDecision::Buy(dec!(6)));
    }
}
