//! Momentum indicators.

use trading_core::traits::Indicator;

/// Relative Strength Index (RSI).
///
/// Average gain and average loss are simple rolling means of the positive and
/// negative close-to-close changes over `period` changes, so the first value
/// needs `period + 1` closes.
///
/// A window with no losses reads 100 when it has any gain, and 50 when the
/// price did not move at all.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    /// Create a new RSI indicator.
    ///
    /// Common periods are 14 (default) or 9.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    fn from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            if avg_gain == 0.0 {
                50.0
            } else {
                100.0
            }
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        }
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Indicator for Rsi {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.period {
            return vec![];
        }

        // Calculate price changes
        let mut gains = Vec::with_capacity(data.len() - 1);
        let mut losses = Vec::with_capacity(data.len() - 1);

        for i in 1..data.len() {
            let change = data[i] - data[i - 1];
            if change > 0.0 {
                gains.push(change);
                losses.push(0.0);
            } else {
                gains.push(0.0);
                losses.push(-change);
            }
        }

        // Each window is summed directly so a zero-loss window reads exactly zero
        let period_f64 = self.period as f64;
        gains
            .windows(self.period)
            .zip(losses.windows(self.period))
            .map(|(g, l)| {
                let avg_gain = g.iter().sum::<f64>() / period_f64;
                let avg_loss = l.iter().sum::<f64>() / period_f64;
                Self::from_averages(avg_gain, avg_loss)
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period + 1 // Need period+1 data points
    }

    fn name(&self) -> &str {
        "RSI"
    }
}
