//! SuperTrend direction-flip adapter.

use tracing::debug;

use crate::domain::adapter::{ADAPTOR_NAME_LABEL, SignalAdapter, report_signal};
use crate::domain::error::IndicatorError;
use crate::domain::indicator::SuperTrend;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::StockAction;
use crate::ports::metrics_port::{Labels, MetricsScope};

/// A flip needs a previous trend to compare against, so signalling starts on
/// the second update after the indicator initializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NotInitialized,
    Initialized,
    StartSignaling,
}

#[derive(Debug, Clone)]
pub struct SuperTrendAdapter {
    name: String,
    supertrend: SuperTrend,
    readiness: Readiness,
    previous_up: bool,
    current_up: bool,
    last_time: Option<i64>,
    metrics: MetricsScope,
}

impl SuperTrendAdapter {
    pub fn new(period: usize, multiplier: f64, metrics: MetricsScope) -> Self {
        let name = format!("SuperTrend_{}_{:.2}", period, multiplier);
        Self {
            supertrend: SuperTrend::new(period, multiplier),
            readiness: Readiness::NotInitialized,
            previous_up: false,
            current_up: false,
            last_time: None,
            metrics: metrics.with(ADAPTOR_NAME_LABEL, name.as_str()),
            name,
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }
}

impl SignalAdapter for SuperTrendAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        debug!(adapter = %self.name, time = bar.time, "adding bar");
        self.supertrend.add_bar(bar)?;
        self.last_time = Some(bar.time);

        if !self.supertrend.is_initialized() {
            return Ok(());
        }
        match self.readiness {
            Readiness::NotInitialized => self.readiness = Readiness::Initialized,
            Readiness::Initialized | Readiness::StartSignaling => {
                self.previous_up = self.current_up;
                self.readiness = Readiness::StartSignaling;
            }
        }
        self.current_up = self.supertrend.is_up_trend();

        let direction = if self.current_up { 1.0 } else { 0.0 };
        self.metrics.gauge("supertrend_direction", direction);
        self.metrics.gauge("supertrend_line", self.supertrend.line());
        Ok(())
    }

    fn signal(&self) -> StockAction {
        let action = match (self.readiness, self.previous_up, self.current_up) {
            (Readiness::StartSignaling, false, true) => StockAction::Buy,
            (Readiness::StartSignaling, true, false) => StockAction::Sell,
            _ => StockAction::Wait,
        };
        report_signal(
            &self.metrics,
            "supertrend_signals_generated",
            &self.name,
            self.last_time,
            action,
        )
    }

    fn fresh(&self, labels: &Labels) -> Self {
        Self::new(
            self.supertrend.period(),
            self.supertrend.multiplier(),
            self.metrics.relabel(labels.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::hlc;

    fn flip_bars() -> Vec<PriceBar> {
        hlc(&[
            (10.0, 8.0, 9.0),
            (11.0, 9.0, 10.0),
            (20.0, 18.0, 20.0),
            (12.0, 10.0, 10.0),
            (12.0, 10.0, 11.0),
        ])
    }

    #[test]
    fn name_format() {
        let adapter = SuperTrendAdapter::new(10, 3.0, MetricsScope::noop());
        assert_eq!(adapter.name(), "SuperTrend_10_3.00");
    }

    #[test]
    fn readiness_progression() {
        let bars = flip_bars();
        let mut adapter = SuperTrendAdapter::new(2, 0.1, MetricsScope::noop());
        adapter.add_bar(&bars[0]).unwrap();
        assert_eq!(adapter.readiness(), Readiness::NotInitialized);
        adapter.add_bar(&bars[1]).unwrap();
        assert_eq!(adapter.readiness(), Readiness::Initialized);
        adapter.add_bar(&bars[2]).unwrap();
        assert_eq!(adapter.readiness(), Readiness::StartSignaling);
    }

    #[test]
    fn flips_produce_buy_then_sell() {
        let mut adapter = SuperTrendAdapter::new(2, 0.1, MetricsScope::noop());
        let out: Vec<StockAction> = flip_bars()
            .iter()
            .map(|bar| {
                adapter.add_bar(bar).unwrap();
                adapter.signal()
            })
            .collect();
        assert_eq!(
            out,
            vec![
                StockAction::Wait,
                StockAction::Wait,
                StockAction::Buy,
                StockAction::Sell,
                StockAction::Wait,
            ]
        );
    }

    #[test]
    fn invalid_bar_is_rejected_without_state_change() {
        let bars = flip_bars();
        let mut adapter = SuperTrendAdapter::new(2, 0.1, MetricsScope::noop());
        adapter.add_bar(&bars[0]).unwrap();
        adapter.add_bar(&bars[1]).unwrap();

        let bad = PriceBar::new(10, -1.0, 5.0, 4.0, 4.5, 0.0);
        assert!(matches!(
            adapter.add_bar(&bad),
            Err(IndicatorError::InvalidInput { .. })
        ));
        assert_eq!(adapter.readiness(), Readiness::Initialized);
        assert_eq!(adapter.signal(), StockAction::Wait);
    }
}
