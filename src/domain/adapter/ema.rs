//! Multi-period EMA crossover adapter.
//!
//! Periods are sorted ascending. Buy when the shortest EMA started the
//! retained window below every longer EMA and has crossed each of them; Sell
//! is the mirror. Values are recorded only once every EMA is initialized so
//! all windows stay aligned.

use tracing::debug;

use crate::domain::adapter::{
    ADAPTOR_NAME_LABEL, PERIOD_LABEL, SignalAdapter, lines_intersect, report_signal,
};
use crate::domain::error::IndicatorError;
use crate::domain::indicator::{Ema, ensure_after};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::StockAction;
use crate::domain::window::RollingWindow;
use crate::ports::metrics_port::{Labels, MetricsScope};

#[derive(Debug, Clone)]
pub struct EmaAdapter {
    name: String,
    periods: Vec<usize>,
    max_history: usize,
    emas: Vec<Ema>,
    history: Vec<RollingWindow<f64>>,
    last_time: Option<i64>,
    metrics: MetricsScope,
}

impl EmaAdapter {
    pub fn new(periods: &[usize], max_history: usize, metrics: MetricsScope) -> Self {
        let mut periods = periods.to_vec();
        periods.sort_unstable();
        let joined = periods
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("_");
        let name = format!("EMA_{}", joined);

        Self {
            emas: periods.iter().map(|p| Ema::new(*p)).collect(),
            history: periods
                .iter()
                .map(|_| RollingWindow::new(max_history))
                .collect(),
            metrics: metrics.with(ADAPTOR_NAME_LABEL, name.as_str()),
            name,
            periods,
            max_history,
            last_time: None,
        }
    }

    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    /// Retained EMA values for `period`, oldest first.
    pub fn history(&self, period: usize) -> Option<&RollingWindow<f64>> {
        self.periods
            .iter()
            .position(|p| *p == period)
            .and_then(|i| self.history.get(i))
    }

    fn all_initialized(&self) -> bool {
        self.emas.iter().all(Ema::is_initialized)
    }

    fn crossed(&self, short_below: bool) -> bool {
        let Some((short, longer)) = self.history.split_first() else {
            return false;
        };
        let Some(short_start) = short.first() else {
            return false;
        };
        longer.iter().all(|line| {
            let Some(line_start) = line.first() else {
                return false;
            };
            let ordered = if short_below {
                short_start < line_start
            } else {
                short_start > line_start
            };
            ordered && lines_intersect(short, line)
        })
    }
}

impl SignalAdapter for EmaAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        debug!(adapter = %self.name, time = bar.time, "adding bar");
        ensure_after(self.last_time, bar)?;
        for ema in &mut self.emas {
            ema.add_bar(bar)?;
        }
        self.last_time = Some(bar.time);

        if !self.all_initialized() {
            return Ok(());
        }
        for ((ema, window), period) in self
            .emas
            .iter()
            .zip(self.history.iter_mut())
            .zip(&self.periods)
        {
            window.push(ema.value());
            self.metrics
                .with(PERIOD_LABEL, period.to_string())
                .gauge("ema_value", ema.value());
        }
        Ok(())
    }

    fn signal(&self) -> StockAction {
        let action = if self.periods.len() < 2
            || !self.all_initialized()
            || self.history.last().is_none_or(|w| w.len() < 2)
        {
            StockAction::Wait
        } else if self.crossed(true) {
            StockAction::Buy
        } else if self.crossed(false) {
            StockAction::Sell
        } else {
            StockAction::Wait
        };
        report_signal(
            &self.metrics,
            "ema_signals_generated",
            &self.name,
            self.last_time,
            action,
        )
    }

    fn fresh(&self, labels: &Labels) -> Self {
        Self::new(
            &self.periods,
            self.max_history,
            self.metrics.relabel(labels.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::adapter::test_support::recording_scope;
    use crate::domain::indicator::test_bars::closes;

    fn feed(adapter: &mut EmaAdapter, prices: &[f64]) -> Vec<StockAction> {
        closes(prices)
            .iter()
            .map(|bar| {
                adapter.add_bar(bar).unwrap();
                adapter.signal()
            })
            .collect()
    }

    #[test]
    fn name_sorts_periods() {
        let adapter = EmaAdapter::new(&[20, 5, 10], 5, MetricsScope::noop());
        assert_eq!(adapter.name(), "EMA_5_10_20");
        assert_eq!(adapter.periods(), &[5, 10, 20]);
    }

    #[test]
    fn waits_until_longest_has_two_values() {
        let mut adapter = EmaAdapter::new(&[2, 3], 5, MetricsScope::noop());
        let signals = feed(&mut adapter, &[10.0, 10.0, 10.0]);
        assert!(signals.iter().all(|s| *s == StockAction::Wait));
        assert_eq!(adapter.history(3).map(|w| w.len()), Some(1));
        assert_eq!(adapter.history(2).map(|w| w.len()), Some(1));
    }

    #[test]
    fn buy_on_upward_cross() {
        // falling then sharply rising: the fast EMA starts below and ends above
        let mut adapter = EmaAdapter::new(&[2, 3], 3, MetricsScope::noop());
        let signals = feed(&mut adapter, &[30.0, 20.0, 10.0, 10.0, 40.0]);
        assert_eq!(signals.last(), Some(&StockAction::Buy));
    }

    #[test]
    fn sell_on_downward_cross() {
        let mut adapter = EmaAdapter::new(&[2, 3], 3, MetricsScope::noop());
        let signals = feed(&mut adapter, &[10.0, 20.0, 30.0, 30.0, 0.5]);
        assert_eq!(signals.last(), Some(&StockAction::Sell));
    }

    #[test]
    fn no_signal_without_cross() {
        let mut adapter = EmaAdapter::new(&[2, 3], 3, MetricsScope::noop());
        let signals = feed(&mut adapter, &[10.0, 20.0, 30.0, 40.0, 50.0]);
        assert!(signals.iter().all(|s| *s == StockAction::Wait));
    }

    #[test]
    fn single_period_never_signals() {
        let mut adapter = EmaAdapter::new(&[2], 3, MetricsScope::noop());
        let signals = feed(&mut adapter, &[30.0, 20.0, 10.0, 10.0, 40.0]);
        assert!(signals.iter().all(|s| *s == StockAction::Wait));
    }

    #[test]
    fn out_of_order_bar_leaves_state() {
        let mut adapter = EmaAdapter::new(&[2, 3], 3, MetricsScope::noop());
        feed(&mut adapter, &[10.0, 20.0, 30.0, 40.0]);
        let emas = adapter.emas.clone();
        let history = adapter.history.clone();

        let stale = PriceBar::new(2, 1.0, 1.0, 1.0, 1.0, 0.0);
        assert!(adapter.add_bar(&stale).is_err());
        assert_eq!(adapter.emas, emas);
        assert_eq!(adapter.history, history);
    }

    #[test]
    fn emits_value_gauges_and_signal_counter() {
        let (sink, scope) = recording_scope();
        let mut adapter = EmaAdapter::new(&[2, 3], 3, scope);
        feed(&mut adapter, &[10.0, 20.0, 30.0]);

        let labels = Labels::new()
            .with(ADAPTOR_NAME_LABEL, "EMA_2_3")
            .with(PERIOD_LABEL, "3");
        assert_eq!(sink.gauge("ema_value", &labels), Some(20.0));

        let wait = Labels::new()
            .with(ADAPTOR_NAME_LABEL, "EMA_2_3")
            .with("signal_type", "wait");
        assert_eq!(sink.counter("ema_signals_generated", &wait), 3);
    }
}
