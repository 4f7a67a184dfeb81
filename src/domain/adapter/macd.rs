//! MACD / signal-line crossover adapter.

use tracing::debug;

use crate::domain::adapter::{ADAPTOR_NAME_LABEL, SignalAdapter, lines_intersect, report_signal};
use crate::domain::error::IndicatorError;
use crate::domain::indicator::Macd;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::StockAction;
use crate::domain::window::RollingWindow;
use crate::ports::metrics_port::{Labels, MetricsScope};

#[derive(Debug, Clone)]
pub struct MacdAdapter {
    name: String,
    macd: Macd,
    max_history: usize,
    macd_lines: RollingWindow<f64>,
    signal_lines: RollingWindow<f64>,
    last_time: Option<i64>,
    metrics: MetricsScope,
}

impl MacdAdapter {
    pub fn new(
        short_period: usize,
        long_period: usize,
        signal_period: usize,
        max_history: usize,
        metrics: MetricsScope,
    ) -> Self {
        let name = format!("MACD_{}_{}_{}", short_period, long_period, signal_period);
        Self {
            macd: Macd::new(short_period, long_period, signal_period),
            max_history,
            macd_lines: RollingWindow::new(max_history),
            signal_lines: RollingWindow::new(max_history),
            last_time: None,
            metrics: metrics.with(ADAPTOR_NAME_LABEL, name.as_str()),
            name,
        }
    }

    /// Buy when the MACD line began the window under the signal line and the
    /// two have crossed; Sell when it began above.
    fn crossover(&self) -> StockAction {
        let (Some(line), Some(signal)) = (self.macd_lines.first(), self.signal_lines.first())
        else {
            return StockAction::Wait;
        };
        if !lines_intersect(&self.signal_lines, &self.macd_lines) {
            return StockAction::Wait;
        }
        if line < signal {
            StockAction::Buy
        } else if line > signal {
            StockAction::Sell
        } else {
            StockAction::Wait
        }
    }
}

impl SignalAdapter for MacdAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        debug!(adapter = %self.name, time = bar.time, "adding bar");
        self.macd.add_bar(bar)?;
        self.last_time = Some(bar.time);

        if self.macd.is_initialized() {
            let value = self.macd.value();
            self.macd_lines.push(value.macd_line);
            self.signal_lines.push(value.signal_line);
            self.metrics.gauge("macd_line", value.macd_line);
            self.metrics.gauge("macd_signal_line", value.signal_line);
        }
        self.metrics.increment("macd_data_points_added_total");
        Ok(())
    }

    fn signal(&self) -> StockAction {
        let action = if self.macd_lines.len() < 2 || !self.macd.is_initialized() {
            StockAction::Wait
        } else {
            self.crossover()
        };
        report_signal(
            &self.metrics,
            "macd_signals_generated",
            &self.name,
            self.last_time,
            action,
        )
    }

    fn fresh(&self, labels: &Labels) -> Self {
        Self::new(
            self.macd.short_period(),
            self.macd.long_period(),
            self.macd.signal_period(),
            self.max_history,
            self.metrics.relabel(labels.clone()),
        )
    }
}
