//! Time-window gates: buy cooldown and long-term holding period.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Blocks new buys for a fixed number of hours after the last filled buy.
///
/// A zero-hour cooldown is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownGate {
    hours: u32,
}

impl CooldownGate {
    pub fn new(hours: u32) -> Self {
        Self { hours }
    }

    pub fn disabled() -> Self {
        Self { hours: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.hours > 0
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Time left before another buy is allowed, if the gate is closed.
    pub fn remaining(&self, last_buy: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Duration> {
        if !self.is_enabled() {
            return None;
        }
        let last_buy = last_buy?;
        let elapsed = now - last_buy;
        let window = Duration::hours(i64::from(self.hours));
        if elapsed < window {
            Some(window - elapsed)
        } else {
            None
        }
    }

    /// Whether a buy is blocked at `now`.
    pub fn is_active(&self, last_buy: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        self.remaining(last_buy, now).is_some()
    }
}

/// Splits holdings into short-term and long-term by days held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingPeriod {
    long_term_days: u32,
}

impl Default for HoldingPeriod {
    fn default() -> Self {
        Self { long_term_days: 365 }
    }
}

impl HoldingPeriod {
    pub fn new(long_term_days: u32) -> Self {
        Self { long_term_days }
    }

    /// Whole days between purchase and `now`.
    pub fn held_days(purchased_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        (now - purchased_at).num_days()
    }

    /// A sale is short-term when held fewer than the threshold days, or when
    /// the purchase date is unknown.
    pub fn is_short_term(&self, purchased_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match purchased_at {
            Some(at) => Self::held_days(at, now) < i64::from(self.long_term_days),
            None => true,
        }
    }
}
