//! Indicator trait definitions.

/// Trait for technical indicators.
///
/// Indicators process price data and produce derived values
/// useful for trading decisions.
pub trait Indicator: Send + Sync {
    /// Calculate indicator values for the given data.
    ///
    /// The result holds one value per position where the indicator is
    /// defined, so it is shorter than `data` by the warmup length.
    fn calculate(&self, data: &[f64]) -> Vec<f64>;

    /// Get the minimum data points required.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Calculate values aligned index-for-index with `data`, with `None`
    /// wherever the indicator is not yet defined.
    fn calculate_aligned(&self, data: &[f64]) -> Vec<Option<f64>> {
        let values = self.calculate(data);
        let pad = data.len().saturating_sub(values.len());
        std::iter::repeat(None)
            .take(pad)
            .chain(values.into_iter().map(Some))
            .collect()
    }
}
