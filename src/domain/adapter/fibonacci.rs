//! Fibonacci retracement retest adapter.
//!
//! Only acts while the current close sits strictly inside the 23.6%–76.4%
//! band. Scanning earlier closes from newest to oldest, a close near the top
//! zone (0%–23.6%) is a Sell and a close near the bottom zone (76.4%–100%) is
//! a Buy. An earlier close inside the band ends the scan.

use tracing::debug;

use crate::domain::adapter::{ADAPTOR_NAME_LABEL, SignalAdapter, report_signal};
use crate::domain::error::IndicatorError;
use crate::domain::indicator::{Fibonacci, FibonacciLevel, FibonacciLevels};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::StockAction;
use crate::domain::window::RollingWindow;
use crate::ports::metrics_port::{Labels, MetricsScope};

const FIBONACCI_LEVEL_LABEL: &str = "fibonacci_level";
const BUFFER: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct FibonacciAdapter {
    name: String,
    fibonacci: Fibonacci,
    closes: RollingWindow<f64>,
    last_time: Option<i64>,
    metrics: MetricsScope,
}

impl FibonacciAdapter {
    pub fn new(size: usize, metrics: MetricsScope) -> Self {
        let name = format!("Fibonacci_{}", size);
        Self {
            fibonacci: Fibonacci::new(size),
            closes: RollingWindow::new(size),
            last_time: None,
            metrics: metrics.with(ADAPTOR_NAME_LABEL, name.as_str()),
            name,
        }
    }

    fn retest(&self, levels: &FibonacciLevels) -> StockAction {
        let Some(&current) = self.closes.last() else {
            return StockAction::Wait;
        };
        let top = levels.get(FibonacciLevel::Zero);
        let l23 = levels.get(FibonacciLevel::TwentyThree);
        let l38 = levels.get(FibonacciLevel::ThirtyEight);
        let l76 = levels.get(FibonacciLevel::SeventySix);
        let bottom = levels.get(FibonacciLevel::Hundred);

        if current >= l23 || current <= l76 {
            return StockAction::Wait;
        }

        for &prev in self.closes.iter().rev().skip(1) {
            if within_zone(prev, l23, top, l38 - l23) {
                return StockAction::Sell;
            }
            if within_zone(prev, bottom, l76, bottom - l76) {
                return StockAction::Buy;
            }
            if prev > l76 && prev < l23 {
                break;
            }
        }
        StockAction::Wait
    }
}

/// `value` lies in [lower, upper] widened by a quarter of the smaller of the
/// zone width and `reference`.
fn within_zone(value: f64, lower: f64, upper: f64, reference: f64) -> bool {
    let buffer = (upper - lower).abs().min(reference.abs()) * BUFFER;
    value >= lower - buffer && value <= upper + buffer
}

impl SignalAdapter for FibonacciAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        debug!(adapter = %self.name, time = bar.time, "adding bar");
        self.fibonacci.add_bar(bar)?;
        self.last_time = Some(bar.time);
        self.closes.push(bar.close);

        for (level, price) in self.fibonacci.levels().iter() {
            self.metrics
                .with(FIBONACCI_LEVEL_LABEL, level.to_string())
                .gauge("fibonacci_level_set", price);
        }
        Ok(())
    }

    fn signal(&self) -> StockAction {
        let action = if self.fibonacci.is_initialized() {
            self.retest(&self.fibonacci.levels())
        } else {
            StockAction::Wait
        };
        report_signal(
            &self.metrics,
            "fibonacci_signals_generated",
            &self.name,
            self.last_time,
            action,
        )
    }

    fn fresh(&self, labels: &Labels) -> Self {
        Self::new(self.fibonacci.size(), self.metrics.relabel(labels.clone()))
    }
}
