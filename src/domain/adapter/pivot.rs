//! Pivot point breakout adapter.
//!
//! Counts how many of the last five bars closed near each support and
//! resistance level. A level tested at least `threshold` times and then
//! straddled by the current bar with a close beyond it is a breakout (Buy
//! through resistance) or breakdown (Sell through support). Levels further
//! from the pivot are checked first.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::adapter::{ADAPTOR_NAME_LABEL, SignalAdapter, report_signal};
use crate::domain::error::IndicatorError;
use crate::domain::indicator::{PivotLevel, PivotLevels, PivotPoint};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::StockAction;
use crate::domain::window::RollingWindow;
use crate::ports::metrics_port::{Labels, MetricsScope};

const PIVOT_LEVEL_LABEL: &str = "pivot_level";
const RECENT_BARS: usize = 5;
const TOLERANCE: f64 = 0.25;

const RESISTANCES: [PivotLevel; 3] = [
    PivotLevel::Resistance3,
    PivotLevel::Resistance2,
    PivotLevel::Resistance1,
];
const SUPPORTS: [PivotLevel; 3] = [
    PivotLevel::Support3,
    PivotLevel::Support2,
    PivotLevel::Support1,
];

#[derive(Debug, Clone)]
pub struct PivotAdapter {
    name: String,
    pivot: PivotPoint,
    max_history: usize,
    threshold: usize,
    history: RollingWindow<PriceBar>,
    metrics: MetricsScope,
}

impl PivotAdapter {
    pub fn new(max_history: usize, threshold: usize, metrics: MetricsScope) -> Self {
        let name = format!("PivotPoint_{}_{}", max_history, threshold);
        Self {
            pivot: PivotPoint::new(),
            max_history,
            threshold,
            history: RollingWindow::new(max_history),
            metrics: metrics.with(ADAPTOR_NAME_LABEL, name.as_str()),
            name,
        }
    }

    fn recent_tests(&self, levels: &PivotLevels) -> BTreeMap<PivotLevel, usize> {
        let mut tests = BTreeMap::new();
        for bar in self.history.iter().rev().take(RECENT_BARS) {
            for level in RESISTANCES.iter().chain(SUPPORTS.iter()) {
                let (lower, upper) = neighbours(levels, *level);
                if within_range(bar.close, lower, levels.get(*level), upper) {
                    *tests.entry(*level).or_insert(0) += 1;
                }
            }
        }
        tests
    }

    fn breakout(&self, bar: &PriceBar, levels: &PivotLevels) -> StockAction {
        let tests = self.recent_tests(levels);
        let tested = |level: &PivotLevel| tests.get(level).copied().unwrap_or(0) >= self.threshold;

        let through_resistance = RESISTANCES.iter().any(|level| {
            let price = levels.get(*level);
            tested(level) && bar.high > price && bar.low < price && bar.close > price
        });
        if through_resistance {
            return StockAction::Buy;
        }

        let through_support = SUPPORTS.iter().any(|level| {
            let price = levels.get(*level);
            tested(level) && bar.low < price && bar.high > price && bar.close < price
        });
        if through_support {
            StockAction::Sell
        } else {
            StockAction::Wait
        }
    }
}

/// The adjacent levels bounding `level`. The outermost levels use 0 as their
/// missing neighbour.
fn neighbours(levels: &PivotLevels, level: PivotLevel) -> (f64, f64) {
    match level {
        PivotLevel::Resistance1 => (levels.pivot, levels.resistance2),
        PivotLevel::Resistance2 => (levels.resistance1, levels.resistance3),
        PivotLevel::Resistance3 => (levels.resistance2, 0.0),
        PivotLevel::Support1 => (levels.support2, levels.pivot),
        PivotLevel::Support2 => (levels.support3, levels.support1),
        PivotLevel::Support3 => (0.0, levels.support2),
        PivotLevel::Pivot => (levels.support1, levels.resistance1),
    }
}

/// `value` lies within a quarter of the narrower gap to either neighbour.
fn within_range(value: f64, lower: f64, mid: f64, upper: f64) -> bool {
    let diff = (mid - lower).abs().min((upper - mid).abs()) * TOLERANCE;
    value >= mid - diff && value <= mid + diff
}

impl SignalAdapter for PivotAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        debug!(adapter = %self.name, time = bar.time, "adding bar");
        self.pivot.add_bar(bar)?;
        self.history.push(*bar);

        let levels = self.pivot.levels();
        for level in PivotLevel::ALL {
            self.metrics
                .with(PIVOT_LEVEL_LABEL, level.to_string())
                .gauge("pivot_point_levels", levels.get(level));
        }
        Ok(())
    }

    fn signal(&self) -> StockAction {
        let current = self.history.last();
        let action = match current {
            Some(bar) if self.pivot.is_initialized() => self.breakout(bar, &self.pivot.levels()),
            _ => StockAction::Wait,
        };
        report_signal(
            &self.metrics,
            "pivot_point_signals_generated",
            &self.name,
            current.map(|b| b.time),
            action,
        )
    }

    fn fresh(&self, labels: &Labels) -> Self {
        Self::new(
            self.max_history,
            self.threshold,
            self.metrics.relabel(labels.clone()),
        )
    }
}
