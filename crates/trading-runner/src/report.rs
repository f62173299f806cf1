//! Run report generation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trading_core::types::{DecisionReason, Side};

/// What happened to one symbol during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SymbolOutcome {
    /// Buy order accepted
    Bought { quantity: Decimal },
    /// Sell order accepted
    Sold { quantity: Decimal, short_term: bool },
    /// Evaluated to hold
    Held { reason: DecisionReason },
    /// Decision reached but the broker refused the order
    OrderFailed {
        side: Side,
        quantity: Decimal,
        error: String,
    },
    /// Fetch, data or gateway failure before a decision was reached
    Skipped { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    #[serde(flatten)]
    pub outcome: SymbolOutcome,
}

/// Outcome tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub bought: usize,
    pub sold: usize,
    pub held: usize,
    pub order_failed: usize,
    pub skipped: usize,
}

/// Complete report for one daily run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Cache epoch the run operated under
    pub epoch: NaiveDate,
    /// The stored cache belonged to an earlier epoch and was discarded
    pub cache_reset: bool,
    /// The non-positive balance alert went out during this run
    pub account_alert: bool,
    /// Remote fetches performed
    pub fetches: usize,
    /// Series served from the cache
    pub cache_hits: usize,
    pub symbols: Vec<SymbolReport>,
}

impl RunReport {
    pub fn new(epoch: NaiveDate, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            epoch,
            cache_reset: false,
            account_alert: false,
            fetches: 0,
            cache_hits: 0,
            symbols: Vec::new(),
        }
    }

    pub fn record(&mut self, symbol: impl Into<String>, outcome: SymbolOutcome) {
        self.symbols.push(SymbolReport {
            symbol: symbol.into(),
            outcome,
        });
    }

    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.finished_at = Some(at);
    }

    /// Outcome for `symbol`, if it was processed.
    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.symbols
            .iter()
            .find(|r| r.symbol == symbol)
            .map(|r| &r.outcome)
    }

    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts::default();
        for report in &self.symbols {
            match report.outcome {
                SymbolOutcome::Bought { .. } => counts.bought += 1,
                SymbolOutcome::Sold { .. } => counts.sold += 1,
                SymbolOutcome::Held { .. } => counts.held += 1,
                SymbolOutcome::OrderFailed { .. } => counts.order_failed += 1,
                SymbolOutcome::Skipped { .. } => counts.skipped += 1,
            }
        }
        counts
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let counts = self.counts();
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     DAILY RUN REPORT                       \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        s.push_str("RUN\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Epoch:               {}\n", self.epoch));
        s.push_str(&format!(
            "  Started:             {}\n",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if let Some(finished) = self.finished_at {
            s.push_str(&format!(
                "  Duration:            {}s\n",
                (finished - self.started_at).num_seconds()
            ));
        }
        s.push_str(&format!(
            "  Cache Reset:         {}\n",
            if self.cache_reset { "yes" } else { "no" }
        ));
        s.push_str(&format!("  Fetches:             {}\n", self.fetches));
        s.push_str(&format!("  Cache Hits:          {}\n", self.cache_hits));
        if self.account_alert {
            s.push_str("  Account Alert:       balance not positive\n");
        }
        s.push('\n');

        s.push_str("OUTCOMES\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Symbols:             {}\n", self.symbols.len()));
        s.push_str(&format!("  Bought:              {}\n", counts.bought));
        s.push_str(&format!("  Sold:                {}\n", counts.sold));
        s.push_str(&format!("  Held:                {}\n", counts.held));
        s.push_str(&format!("  Order Failed:        {}\n", counts.order_failed));
        s.push_str(&format!("  Skipped:             {}\n", counts.skipped));
        s.push('\n');

        let actions: Vec<String> = self
            .symbols
            .iter()
            .filter_map(|r| {
                let line = match &r.outcome {
                    SymbolOutcome::Bought { quantity } => format!("BUY {}", quantity),
                    SymbolOutcome::Sold {
                        quantity,
                        short_term,
                    } => {
                        if *short_term {
                            format!("SELL {} (short-term)", quantity)
                        } else {
                            format!("SELL {}", quantity)
                        }
                    }
                    SymbolOutcome::OrderFailed {
                        side,
                        quantity,
                        error,
                    } => format!("{} {} failed: {}", side, quantity, error),
                    SymbolOutcome::Skipped { error } => format!("skipped: {}", error),
                    SymbolOutcome::Held { .. } => return None,
                };
                Some(format!("  {:<8} {}\n", r.symbol, line))
            })
            .collect();

        if !actions.is_empty() {
            s.push_str("ACTIONS\n");
            s.push_str("───────────────────────────────────────────────────────────\n");
            for line in actions {
                s.push_str(&line);
            }
            s.push('\n');
        }

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> RunReport {
        let epoch = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let mut report = RunReport::new(epoch, Utc::now());
        report.record("AAPL", SymbolOutcome::Bought { quantity: dec!(6) });
        report.record(
            "MSFT",
            SymbolOutcome::Held {
                reason: DecisionReason::NoSignal,
            },
        );
        report.record(
            "ZZZZ",
            SymbolOutcome::Skipped {
                error: "Symbol not found: ZZZZ".into(),
            },
        );
        report.record(
            "TSLA",
            SymbolOutcome::Sold {
                quantity: dec!(3),
                short_term: true,
            },
        );
        report
    }

    #[test]
    fn test_counts() {
        let counts = sample().counts();
        assert_eq!(counts.bought, 1);
        assert_eq!(counts.sold, 1);
        assert_eq!(counts.held, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.order_failed, 0);
    }

    #[test]
    fn test_report_summary() {
        let mut report = sample();
        report.finish(report.started_at);

        let summary = report.summary();
        assert!(summary.contains("Epoch:               2024-06-03"));
        assert!(summary.contains("AAPL     BUY 6"));
        assert!(summary.contains("TSLA     SELL 3 (short-term)"));
        assert!(summary.contains("ZZZZ     skipped"));
        assert!(!summary.contains("MSFT"));
    }

    #[test]
    fn test_json_tags_outcome() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let first = &value["symbols"][0];
        assert_eq!(first["symbol"], "AAPL");
        assert_eq!(first["status"], "bought");

        let held = &value["symbols"][1];
        assert_eq!(held["status"], "held");
        assert_eq!(held["reason"]["reason"], "no_signal");
    }

    #[test]
    fn test_outcome_lookup() {
        let report = sample();
        assert!(matches!(
            report.outcome("AAPL"),
            Some(SymbolOutcome::Bought { .. })
        ));
        assert!(report.outcome("NVDA").is_none());
    }
}
