//! Indicator adapters: turn indicator state into Buy/Sell/Wait opinions.
//!
//! Every adapter owns exactly one indicator (EMA owns one per period), keeps a
//! capped window of computed values, and exposes a deterministic name that
//! encodes its kind and parameters. `fresh` builds an independent copy with
//! the same configuration and empty state, so one configured pool can feed
//! many combinations.

pub mod bollinger;
pub mod ema;
pub mod fibonacci;
pub mod macd;
pub mod pivot;
pub mod rsi;
pub mod supertrend;

use std::fmt;
use std::str::FromStr;

pub use bollinger::BollingerAdapter;
pub use ema::EmaAdapter;
pub use fibonacci::FibonacciAdapter;
pub use macd::MacdAdapter;
pub use pivot::PivotAdapter;
pub use rsi::RsiAdapter;
pub use supertrend::SuperTrendAdapter;

use crate::domain::error::IndicatorError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::StockAction;
use crate::domain::window::RollingWindow;
use crate::ports::metrics_port::{Labels, MetricsScope};

pub const ADAPTOR_NAME_LABEL: &str = "adaptor_name";
pub const SIGNAL_TYPE_LABEL: &str = "signal_type";
pub const PERIOD_LABEL: &str = "period";

pub trait SignalAdapter {
    fn name(&self) -> &str;

    /// Feeds one bar. On error the adapter and its indicator are unchanged.
    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError>;

    /// Opinion for the most recent bar. Never fails; insufficient history
    /// yields `Wait`.
    fn signal(&self) -> StockAction;

    /// Independent copy with identical configuration and empty state whose
    /// metrics carry `labels` plus this adapter's name.
    fn fresh(&self, labels: &Labels) -> Self
    where
        Self: Sized;
}

/// The closed set of adapter kinds.
#[derive(Debug, Clone)]
pub enum IndicatorAdapter {
    Ema(EmaAdapter),
    Rsi(RsiAdapter),
    Macd(MacdAdapter),
    Bollinger(BollingerAdapter),
    Pivot(PivotAdapter),
    Fibonacci(FibonacciAdapter),
    SuperTrend(SuperTrendAdapter),
}

impl IndicatorAdapter {
    pub fn kind(&self) -> AdapterKind {
        match self {
            IndicatorAdapter::Ema(_) => AdapterKind::Ema,
            IndicatorAdapter::Rsi(_) => AdapterKind::Rsi,
            IndicatorAdapter::Macd(_) => AdapterKind::Macd,
            IndicatorAdapter::Bollinger(_) => AdapterKind::Bollinger,
            IndicatorAdapter::Pivot(_) => AdapterKind::Pivot,
            IndicatorAdapter::Fibonacci(_) => AdapterKind::Fibonacci,
            IndicatorAdapter::SuperTrend(_) => AdapterKind::SuperTrend,
        }
    }

    fn inner(&self) -> &dyn SignalAdapter {
        match self {
            IndicatorAdapter::Ema(a) => a,
            IndicatorAdapter::Rsi(a) => a,
            IndicatorAdapter::Macd(a) => a,
            IndicatorAdapter::Bollinger(a) => a,
            IndicatorAdapter::Pivot(a) => a,
            IndicatorAdapter::Fibonacci(a) => a,
            IndicatorAdapter::SuperTrend(a) => a,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SignalAdapter {
        match self {
            IndicatorAdapter::Ema(a) => a,
            IndicatorAdapter::Rsi(a) => a,
            IndicatorAdapter::Macd(a) => a,
            IndicatorAdapter::Bollinger(a) => a,
            IndicatorAdapter::Pivot(a) => a,
            IndicatorAdapter::Fibonacci(a) => a,
            IndicatorAdapter::SuperTrend(a) => a,
        }
    }
}

impl SignalAdapter for IndicatorAdapter {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        self.inner_mut().add_bar(bar)
    }

    fn signal(&self) -> StockAction {
        self.inner().signal()
    }

    fn fresh(&self, labels: &Labels) -> Self {
        match self {
            IndicatorAdapter::Ema(a) => IndicatorAdapter::Ema(a.fresh(labels)),
            IndicatorAdapter::Rsi(a) => IndicatorAdapter::Rsi(a.fresh(labels)),
            IndicatorAdapter::Macd(a) => IndicatorAdapter::Macd(a.fresh(labels)),
            IndicatorAdapter::Bollinger(a) => IndicatorAdapter::Bollinger(a.fresh(labels)),
            IndicatorAdapter::Pivot(a) => IndicatorAdapter::Pivot(a.fresh(labels)),
            IndicatorAdapter::Fibonacci(a) => IndicatorAdapter::Fibonacci(a.fresh(labels)),
            IndicatorAdapter::SuperTrend(a) => IndicatorAdapter::SuperTrend(a.fresh(labels)),
        }
    }
}

macro_rules! impl_from_adapter {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for IndicatorAdapter {
                fn from(adapter: $ty) -> Self {
                    IndicatorAdapter::$variant(adapter)
                }
            }
        )*
    };
}

impl_from_adapter! {
    Ema => EmaAdapter,
    Rsi => RsiAdapter,
    Macd => MacdAdapter,
    Bollinger => BollingerAdapter,
    Pivot => PivotAdapter,
    Fibonacci => FibonacciAdapter,
    SuperTrend => SuperTrendAdapter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdapterKind {
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Pivot,
    Fibonacci,
    SuperTrend,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 7] = [
        AdapterKind::Ema,
        AdapterKind::Rsi,
        AdapterKind::Macd,
        AdapterKind::Bollinger,
        AdapterKind::Pivot,
        AdapterKind::Fibonacci,
        AdapterKind::SuperTrend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Ema => "ema",
            AdapterKind::Rsi => "rsi",
            AdapterKind::Macd => "macd",
            AdapterKind::Bollinger => "bollinger",
            AdapterKind::Pivot => "pivot",
            AdapterKind::Fibonacci => "fibonacci",
            AdapterKind::SuperTrend => "supertrend",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        AdapterKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| format!("unknown adapter '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmaParams {
    pub periods: Vec<usize>,
    pub history: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsiParams {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
    pub history: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdParams {
    pub short: usize,
    pub long: usize,
    pub signal: usize,
    pub history: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerParams {
    pub period: usize,
    pub history: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotParams {
    pub history: usize,
    pub threshold: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FibonacciParams {
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperTrendParams {
    pub period: usize,
    pub multiplier: f64,
}

/// Which adapters make up the pool, in order, and their parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterPoolConfig {
    pub enabled: Vec<AdapterKind>,
    pub ema: EmaParams,
    pub rsi: RsiParams,
    pub macd: MacdParams,
    pub bollinger: BollingerParams,
    pub pivot: PivotParams,
    pub fibonacci: FibonacciParams,
    pub supertrend: SuperTrendParams,
}

impl Default for AdapterPoolConfig {
    fn default() -> Self {
        Self {
            enabled: vec![
                AdapterKind::Ema,
                AdapterKind::Rsi,
                AdapterKind::Macd,
                AdapterKind::Pivot,
                AdapterKind::SuperTrend,
            ],
            ema: EmaParams {
                periods: vec![5, 10, 20],
                history: 5,
            },
            rsi: RsiParams {
                period: 14,
                overbought: 70.0,
                oversold: 30.0,
                history: 5,
            },
            macd: MacdParams {
                short: 12,
                long: 26,
                signal: 9,
                history: 5,
            },
            bollinger: BollingerParams {
                period: 20,
                history: 5,
            },
            pivot: PivotParams {
                history: 10,
                threshold: 2,
            },
            fibonacci: FibonacciParams { size: 20 },
            supertrend: SuperTrendParams {
                period: 10,
                multiplier: 3.0,
            },
        }
    }
}

/// Builds the configured adapter pool in `enabled` order.
pub fn build_pool(config: &AdapterPoolConfig, metrics: &MetricsScope) -> Vec<IndicatorAdapter> {
    config
        .enabled
        .iter()
        .map(|kind| build_adapter(*kind, config, metrics))
        .collect()
}

fn build_adapter(
    kind: AdapterKind,
    config: &AdapterPoolConfig,
    metrics: &MetricsScope,
) -> IndicatorAdapter {
    let metrics = metrics.clone();
    match kind {
        AdapterKind::Ema => {
            EmaAdapter::new(&config.ema.periods, config.ema.history, metrics).into()
        }
        AdapterKind::Rsi => RsiAdapter::new(
            config.rsi.period,
            config.rsi.overbought,
            config.rsi.oversold,
            config.rsi.history,
            metrics,
        )
        .into(),
        AdapterKind::Macd => MacdAdapter::new(
            config.macd.short,
            config.macd.long,
            config.macd.signal,
            config.macd.history,
            metrics,
        )
        .into(),
        AdapterKind::Bollinger => {
            BollingerAdapter::new(config.bollinger.period, config.bollinger.history, metrics).into()
        }
        AdapterKind::Pivot => {
            PivotAdapter::new(config.pivot.history, config.pivot.threshold, metrics).into()
        }
        AdapterKind::Fibonacci => FibonacciAdapter::new(config.fibonacci.size, metrics).into(),
        AdapterKind::SuperTrend => SuperTrendAdapter::new(
            config.supertrend.period,
            config.supertrend.multiplier,
            metrics,
        )
        .into(),
    }
}

/// True when the two lines swap order between the start and the end of their
/// windows. Lines with fewer than two points never intersect.
pub fn lines_intersect(line1: &RollingWindow<f64>, line2: &RollingWindow<f64>) -> bool {
    if line1.len() <= 1 || line2.len() <= 1 {
        return false;
    }
    match (line1.first(), line1.last(), line2.first(), line2.last()) {
        (Some(a0), Some(an), Some(b0), Some(bn)) => (a0 > b0 && an < bn) || (a0 < b0 && an > bn),
        _ => false,
    }
}

/// Counts the signal and logs Buy/Sell at info, Wait at debug.
pub(crate) fn report_signal(
    metrics: &MetricsScope,
    counter: &str,
    adapter: &str,
    time: Option<i64>,
    action: StockAction,
) -> StockAction {
    metrics
        .with(SIGNAL_TYPE_LABEL, action.as_str())
        .increment(counter);
    if action.is_actionable() {
        tracing::info!(adapter, ?time, %action, "signal detected");
    } else {
        tracing::debug!(adapter, ?time, "no trading signal");
    }
    action
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::adapters::memory_metrics::InMemoryMetrics;
    use crate::ports::metrics_port::{Labels, MetricsScope};

    pub fn recording_scope() -> (Arc<InMemoryMetrics>, MetricsScope) {
        let sink = Arc::new(InMemoryMetrics::new());
        let scope = MetricsScope::new(sink.clone(), Labels::new());
        (sink, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(values: &[f64]) -> RollingWindow<f64> {
        let mut w = RollingWindow::new(values.len().max(1));
        for v in values {
            w.push(*v);
        }
        w
    }

    #[test]
    fn intersect_requires_two_points() {
        assert!(!lines_intersect(&window(&[1.0]), &window(&[2.0, 0.0])));
        assert!(!lines_intersect(&window(&[]), &window(&[])));
    }

    #[test]
    fn intersect_detects_order_swap() {
        assert!(lines_intersect(&window(&[1.0, 5.0, 3.0]), &window(&[2.0, 2.0, 2.0])));
        assert!(lines_intersect(&window(&[3.0, 0.0]), &window(&[2.0, 2.0])));
        assert!(!lines_intersect(&window(&[1.0, 1.5]), &window(&[2.0, 2.0])));
        // touching at an endpoint is not a cross
        assert!(!lines_intersect(&window(&[1.0, 2.0]), &window(&[2.0, 2.0])));
    }

    #[test]
    fn adapter_kind_parses() {
        assert_eq!("EMA".parse::<AdapterKind>(), Ok(AdapterKind::Ema));
        assert_eq!(" supertrend ".parse::<AdapterKind>(), Ok(AdapterKind::SuperTrend));
        assert!("vwap".parse::<AdapterKind>().is_err());
    }

    #[test]
    fn default_pool_names() {
        let pool = build_pool(&AdapterPoolConfig::default(), &MetricsScope::noop());
        let names: Vec<&str> = pool.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                "EMA_5_10_20",
                "RSI_P(14)_OBT(70.00)_OST(30.00)_L(5)",
                "MACD_12_26_9",
                "PivotPoint_10_2",
                "SuperTrend_10_3.00",
            ]
        );
        assert_eq!(pool[3].kind(), AdapterKind::Pivot);
    }

    #[test]
    fn every_kind_builds() {
        let config = AdapterPoolConfig {
            enabled: AdapterKind::ALL.to_vec(),
            ..AdapterPoolConfig::default()
        };
        let pool = build_pool(&config, &MetricsScope::noop());
        let kinds: Vec<AdapterKind> = pool.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, AdapterKind::ALL.to_vec());
    }

    #[test]
    fn fresh_keeps_configuration() {
        let pool = build_pool(&AdapterPoolConfig::default(), &MetricsScope::noop());
        for adapter in &pool {
            let copy = adapter.fresh(&Labels::new().with("algorithm_name", "x"));
            assert_eq!(copy.name(), adapter.name());
            assert_eq!(copy.kind(), adapter.kind());
        }
    }
}
