//! Bollinger band re-entry adapter.
//!
//! Buy when the previous close sat below its lower band and the current
//! close is back at or above the current lower band. Sell is the mirror on
//! the upper band.

use tracing::debug;

use crate::domain::adapter::{ADAPTOR_NAME_LABEL, SignalAdapter, report_signal};
use crate::domain::error::IndicatorError;
use crate::domain::indicator::{BollingerBands, BollingerValue};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::StockAction;
use crate::domain::window::RollingWindow;
use crate::ports::metrics_port::{Labels, MetricsScope};

#[derive(Debug, Clone, Copy, PartialEq)]
struct BandRecord {
    close: f64,
    bands: BollingerValue,
}

#[derive(Debug, Clone)]
pub struct BollingerAdapter {
    name: String,
    bands: BollingerBands,
    max_history: usize,
    history: RollingWindow<BandRecord>,
    last_time: Option<i64>,
    metrics: MetricsScope,
}

impl BollingerAdapter {
    pub fn new(period: usize, max_history: usize, metrics: MetricsScope) -> Self {
        let name = format!("Bollinger_{}_L({})", period, max_history);
        Self {
            bands: BollingerBands::new(period),
            max_history,
            history: RollingWindow::new(max_history.max(2)),
            last_time: None,
            metrics: metrics.with(ADAPTOR_NAME_LABEL, name.as_str()),
            name,
        }
    }

    fn reentry(&self) -> StockAction {
        let previous = self
            .history
            .len()
            .checked_sub(2)
            .and_then(|i| self.history.get(i));
        let (Some(prev), Some(curr)) = (previous, self.history.last()) else {
            return StockAction::Wait;
        };
        if prev.close < prev.bands.lower_band && curr.close >= curr.bands.lower_band {
            StockAction::Buy
        } else if prev.close > prev.bands.upper_band && curr.close <= curr.bands.upper_band {
            StockAction::Sell
        } else {
            StockAction::Wait
        }
    }
}

impl SignalAdapter for BollingerAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        debug!(adapter = %self.name, time = bar.time, "adding bar");
        self.bands.add_bar(bar)?;
        self.last_time = Some(bar.time);

        if self.bands.is_initialized() {
            let bands = self.bands.value();
            self.history.push(BandRecord {
                close: bar.close,
                bands,
            });
            self.metrics
                .gauge("bollinger_moving_average", bands.moving_average);
            self.metrics.gauge("bollinger_upper_band", bands.upper_band);
            self.metrics.gauge("bollinger_lower_band", bands.lower_band);
        }
        Ok(())
    }

    fn signal(&self) -> StockAction {
        let action = if !self.bands.is_initialized() {
            StockAction::Wait
        } else {
            self.reentry()
        };
        report_signal(
            &self.metrics,
            "bollinger_signals_generated",
            &self.name,
            self.last_time,
            action,
        )
    }

    fn fresh(&self, labels: &Labels) -> Self {
        Self::new(
            self.bands.period(),
            self.max_history,
            self.metrics.relabel(labels.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::closes;

    fn signals(adapter: &mut BollingerAdapter, prices: &[f64]) -> Vec<StockAction> {
        closes(prices)
            .iter()
            .map(|bar| {
                adapter.add_bar(bar).unwrap();
                adapter.signal()
            })
            .collect()
    }

    #[test]
    fn name_format() {
        let adapter = BollingerAdapter::new(20, 5, MetricsScope::noop());
        assert_eq!(adapter.name(), "Bollinger_20_L(5)");
    }

    #[test]
    fn reentry_above_lower_band_is_buy() {
        // the 0 close pierces the lower band (about 0.88), the next 10 is back inside
        let mut adapter = BollingerAdapter::new(6, 5, MetricsScope::noop());
        let out = signals(&mut adapter, &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 0.0, 10.0]);
        assert_eq!(out[6], StockAction::Wait);
        assert_eq!(out[7], StockAction::Buy);
    }

    #[test]
    fn reentry_below_upper_band_is_sell() {
        let mut adapter = BollingerAdapter::new(6, 5, MetricsScope::noop());
        let out = signals(&mut adapter, &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 20.0, 10.0]);
        assert_eq!(out[6], StockAction::Wait);
        assert_eq!(out[7], StockAction::Sell);
    }

    #[test]
    fn flat_prices_wait() {
        let mut adapter = BollingerAdapter::new(3, 5, MetricsScope::noop());
        let out = signals(&mut adapter, &[10.0; 8]);
        assert!(out.iter().all(|s| *s == StockAction::Wait));
    }

    #[test]
    fn out_of_order_bar_is_rejected() {
        let mut adapter = BollingerAdapter::new(3, 5, MetricsScope::noop());
        signals(&mut adapter, &[10.0, 11.0, 12.0]);
        let history = adapter.history.clone();
        assert!(adapter.add_bar(&closes(&[1.0])[0]).is_err());
        assert_eq!(adapter.history, history);
    }
}
