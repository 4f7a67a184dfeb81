//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the simple average of the first n closes, then
//! EMA = (C - EMA) * k + EMA.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::{ensure_after, mean};
use crate::domain::ohlcv::PriceBar;

#[derive(Debug, Clone, PartialEq)]
pub struct Ema {
    period: usize,
    multiplier: f64,
    value: f64,
    initialized: bool,
    seed: Vec<f64>,
    last_time: Option<i64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
            value: 0.0,
            initialized: false,
            seed: Vec::with_capacity(period),
            last_time: None,
        }
    }

    pub fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        ensure_after(self.last_time, bar)?;
        self.last_time = Some(bar.time);

        if self.initialized {
            self.value = (bar.close - self.value) * self.multiplier + self.value;
            return Ok(());
        }

        self.seed.push(bar.close);
        if self.seed.len() == self.period {
            let seed = std::mem::take(&mut self.seed);
            self.value = mean(seed.into_iter());
            self.initialized = true;
        }
        Ok(())
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Current EMA; zero until initialized.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::closes;
    use approx::assert_relative_eq;

    fn feed(ema: &mut Ema, bars: &[PriceBar]) {
        for bar in bars {
            ema.add_bar(bar).unwrap();
        }
    }

    #[test]
    fn ema_warmup() {
        let bars = closes(&[10.0, 20.0, 30.0]);
        let mut ema = Ema::new(3);

        feed(&mut ema, &bars[..2]);
        assert!(!ema.is_initialized());
        assert_eq!(ema.value(), 0.0);

        feed(&mut ema, &bars[2..]);
        assert!(ema.is_initialized());
    }

    #[test]
    fn ema_seed_is_sma() {
        let mut ema = Ema::new(3);
        feed(&mut ema, &closes(&[10.0, 20.0, 30.0]));
        assert_relative_eq!(ema.value(), 20.0);
    }

    #[test]
    fn ema_recursive_calculation() {
        let mut ema = Ema::new(3);
        let bars = closes(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        feed(&mut ema, &bars[..3]);

        // k = 2 / (3 + 1) = 0.5
        let mut expected = 20.0;
        for bar in &bars[3..] {
            ema.add_bar(bar).unwrap();
            expected = (bar.close - expected) * 0.5 + expected;
            assert_relative_eq!(ema.value(), expected);
        }
        assert_relative_eq!(ema.value(), 50.0);
    }

    #[test]
    fn ema_period_1_tracks_close() {
        let mut ema = Ema::new(1);
        feed(&mut ema, &closes(&[10.0, 20.0]));
        assert!(ema.is_initialized());
        assert_relative_eq!(ema.value(), 20.0);
    }

    #[test]
    fn ema_smoothing_factor() {
        let ema = Ema::new(10);
        assert_relative_eq!(ema.multiplier(), 2.0 / 11.0);
        assert_eq!(ema.period(), 10);
    }

    #[test]
    fn ema_rejects_out_of_order_bar() {
        let mut ema = Ema::new(2);
        let bars = closes(&[10.0, 20.0, 30.0]);
        feed(&mut ema, &bars);
        let before = ema.clone();

        let stale = PriceBar::new(2, 99.0, 99.0, 99.0, 99.0, 0.0);
        assert!(matches!(
            ema.add_bar(&stale),
            Err(IndicatorError::OutOfOrder {
                previous: 3,
                received: 2
            })
        ));
        assert_eq!(ema, before);
    }
}
