//! RSI threshold-recovery adapter.

use tracing::debug;

use crate::domain::adapter::{ADAPTOR_NAME_LABEL, SignalAdapter, report_signal};
use crate::domain::error::IndicatorError;
use crate::domain::indicator::Rsi;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::StockAction;
use crate::domain::window::RollingWindow;
use crate::ports::metrics_port::{Labels, MetricsScope};

const RSI_LEVEL_LABEL: &str = "rsi_level";

#[derive(Debug, Clone)]
pub struct RsiAdapter {
    name: String,
    rsi: Rsi,
    overbought: f64,
    oversold: f64,
    max_history: usize,
    history: RollingWindow<f64>,
    last_time: Option<i64>,
    metrics: MetricsScope,
}

impl RsiAdapter {
    pub fn new(
        period: usize,
        overbought: f64,
        oversold: f64,
        max_history: usize,
        metrics: MetricsScope,
    ) -> Self {
        let name = format!(
            "RSI_P({})_OBT({:.2})_OST({:.2})_L({})",
            period, overbought, oversold, max_history
        );
        Self {
            rsi: Rsi::new(period),
            overbought,
            oversold,
            max_history,
            history: RollingWindow::new(max_history),
            last_time: None,
            metrics: metrics.with(ADAPTOR_NAME_LABEL, name.as_str()),
            name,
        }
    }

    /// Retained RSI values, oldest first.
    pub fn history(&self) -> &RollingWindow<f64> {
        &self.history
    }
}

/// Scans backwards from the value before the current one. A value beyond a
/// threshold decides the outcome: a current value back inside that threshold
/// signals, otherwise nothing does. A value strictly inside the neutral band
/// ends the scan.
fn threshold_recovery(values: &RollingWindow<f64>, overbought: f64, oversold: f64) -> StockAction {
    let Some(&current) = values.last() else {
        return StockAction::Wait;
    };
    for &value in values.iter().rev().skip(1) {
        if value > overbought {
            if current <= overbought {
                return StockAction::Sell;
            }
            break;
        } else if value < oversold {
            if current >= oversold {
                return StockAction::Buy;
            }
            break;
        } else if value > oversold && value < overbought {
            break;
        }
    }
    StockAction::Wait
}

impl SignalAdapter for RsiAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        debug!(adapter = %self.name, time = bar.time, "adding bar");
        self.metrics
            .with(RSI_LEVEL_LABEL, "over_sold_threshold")
            .gauge("rsi_levels", self.oversold);
        self.metrics
            .with(RSI_LEVEL_LABEL, "over_bought_threshold")
            .gauge("rsi_levels", self.overbought);

        self.rsi.add_bar(bar)?;
        self.last_time = Some(bar.time);

        if self.rsi.is_initialized() {
            let value = self.rsi.value();
            self.history.push(value);
            self.metrics.gauge("rsi_value", value);
        }
        Ok(())
    }

    fn signal(&self) -> StockAction {
        let action = if self.history.len() < 2 || !self.rsi.is_initialized() {
            StockAction::Wait
        } else {
            threshold_recovery(&self.history, self.overbought, self.oversold)
        };
        report_signal(
            &self.metrics,
            "rsi_signals_generated",
            &self.name,
            self.last_time,
            action,
        )
    }

    fn fresh(&self, labels: &Labels) -> Self {
        Self::new(
            self.rsi.period(),
            self.overbought,
            self.oversold,
            self.max_history,
            self.metrics.relabel(labels.clone()),
        )
    }
}
