//! Trading algorithms built from combinations of indicator adapters.

use tracing::info;

use crate::domain::adapter::{IndicatorAdapter, SIGNAL_TYPE_LABEL, SignalAdapter};
use crate::domain::error::IndicatorError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{StockAction, TradingSignal};
use crate::ports::metrics_port::MetricsScope;

pub const ALGORITHM_NAME_LABEL: &str = "algorithm_name";

/// A named strategy that turns each bar into a trading decision.
pub trait TradingAlgorithm {
    fn name(&self) -> &str;

    /// Feeds `bar` and returns the decision for it. Bars must arrive in
    /// strictly increasing time order.
    fn evaluate(&mut self, bar: &PriceBar) -> Result<TradingSignal, IndicatorError>;
}

/// Combines adapter opinions under a unanimity rule: Buy only if every
/// adapter says Buy, Sell only if every adapter says Sell, otherwise Wait.
#[derive(Debug, Clone)]
pub struct CombinationAlgorithm<A = IndicatorAdapter> {
    name: String,
    adapters: Vec<A>,
    metrics: MetricsScope,
}

impl<A: SignalAdapter> CombinationAlgorithm<A> {
    /// Returns `None` when `adapters` is empty.
    pub fn new(adapters: Vec<A>, metrics: &MetricsScope) -> Option<Self> {
        if adapters.is_empty() {
            return None;
        }
        let name = combined_name(adapters.iter());
        Some(Self {
            metrics: metrics.with(ALGORITHM_NAME_LABEL, name.as_str()),
            name,
            adapters,
        })
    }

    pub fn adapters(&self) -> &[A] {
        &self.adapters
    }
}

impl<A: SignalAdapter> TradingAlgorithm for CombinationAlgorithm<A> {
    fn name(&self) -> &str {
        &self.name
    }

    /// Every adapter receives the bar before any vote is taken, so a Wait
    /// from one adapter never leaves another behind. If any adapter rejects
    /// the bar the first such error is returned.
    fn evaluate(&mut self, bar: &PriceBar) -> Result<TradingSignal, IndicatorError> {
        self.metrics.gauge("algorithm_close_price", bar.close);

        let mut first_error = None;
        for adapter in &mut self.adapters {
            if let Err(err) = adapter.add_bar(bar) {
                first_error.get_or_insert(err);
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let action = unanimous(self.adapters.iter().map(SignalAdapter::signal));
        self.metrics
            .with(SIGNAL_TYPE_LABEL, action.as_str())
            .increment("algorithm_signals_generated");
        if action.is_actionable() {
            info!(
                algorithm = %self.name,
                time = bar.time,
                close = bar.close,
                %action,
                "algorithm signal"
            );
        }
        Ok(TradingSignal::new(bar.time, action))
    }
}

/// Stops consuming votes at the first Wait or disagreement. An empty vote
/// is Wait.
pub fn unanimous(votes: impl IntoIterator<Item = StockAction>) -> StockAction {
    let mut agreed = None;
    for vote in votes {
        match (vote, agreed) {
            (StockAction::Wait, _) => return StockAction::Wait,
            (vote, None) => agreed = Some(vote),
            (vote, Some(current)) if vote == current => {}
            _ => return StockAction::Wait,
        }
    }
    agreed.unwrap_or(StockAction::Wait)
}

fn combined_name<'a, A: SignalAdapter + 'a>(adapters: impl Iterator<Item = &'a A>) -> String {
    adapters.map(|a| a.name()).collect::<Vec<_>>().join("_")
}

fn build<A: SignalAdapter>(
    members: &[&A],
    metrics: &MetricsScope,
) -> Option<CombinationAlgorithm<A>> {
    let name = combined_name(members.iter().copied());
    let labels = metrics.labels().with(ALGORITHM_NAME_LABEL, name);
    let adapters = members.iter().map(|a| a.fresh(&labels)).collect();
    CombinationAlgorithm::new(adapters, metrics)
}

/// One algorithm per non-empty subset of `pool`, each with freshly built
/// adapters, in depth-first order: [0], [0,1], [0,1,2], ..., [1], [1,2], ...
pub fn combinations<A: SignalAdapter>(
    pool: &[A],
    metrics: &MetricsScope,
) -> Vec<CombinationAlgorithm<A>> {
    fn generate<'a, A: SignalAdapter>(
        pool: &'a [A],
        current: &mut Vec<&'a A>,
        start: usize,
        metrics: &MetricsScope,
        out: &mut Vec<CombinationAlgorithm<A>>,
    ) {
        if let Some(algorithm) = build(current, metrics) {
            out.push(algorithm);
        }
        for i in start..pool.len() {
            current.push(&pool[i]);
            generate(pool, current, i + 1, metrics, out);
            current.pop();
        }
    }

    let mut out = Vec::with_capacity((1usize << pool.len().min(20)).saturating_sub(1));
    generate(pool, &mut Vec::new(), 0, metrics, &mut out);
    out
}

/// One single-adapter algorithm per pool member.
pub fn individual<A: SignalAdapter>(
    pool: &[A],
    metrics: &MetricsScope,
) -> Vec<CombinationAlgorithm<A>> {
    pool.iter()
        .filter_map(|adapter| build(&[adapter], metrics))
        .collect()
}
