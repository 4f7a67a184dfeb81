//! Price bar representation.

/// One OHLCV observation. `time` is a millisecond Unix timestamp and must be
/// strictly increasing within any single indicator's input stream.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceBar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// (high + low) / 2
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// True when every price field is strictly positive.
    pub fn has_positive_prices(&self) -> bool {
        self.open > 0.0 && self.high > 0.0 && self.low > 0.0 && self.close > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> PriceBar {
        PriceBar::new(1, 100.0, 110.0, 90.0, 105.0, 50_000.0)
    }

    #[test]
    fn midpoint() {
        assert!((sample_bar().midpoint() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        // high-low=20, |110-130|=20, |90-130|=40 → 40
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn positive_prices() {
        assert!(sample_bar().has_positive_prices());
        let bar = PriceBar {
            low: 0.0,
            ..sample_bar()
        };
        assert!(!bar.has_positive_prices());
    }
}
