//! Metrics sink port trait.
//!
//! Counters and gauges are side-channel observations. Swapping one
//! implementation for another never changes backtest results.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Ordered tag set attached to every metric observation. Components extend
/// the labels they were constructed with rather than reading ambient state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `key` set to `value`, replacing any previous value.
    pub fn with(&self, key: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.0.insert(key.to_string(), value.into());
        next
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        f.write_str("}")
    }
}

pub trait MetricsPort: Send + Sync {
    fn increment_counter(&self, name: &str, labels: &Labels);
    fn set_gauge(&self, name: &str, value: f64, labels: &Labels);
}

/// Discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsPort for NoopMetrics {
    fn increment_counter(&self, _name: &str, _labels: &Labels) {}
    fn set_gauge(&self, _name: &str, _value: f64, _labels: &Labels) {}
}

/// A metrics sink bound to a label set. Components hold one of these and
/// extend it with their own labels before emitting.
#[derive(Clone)]
pub struct MetricsScope {
    sink: Arc<dyn MetricsPort>,
    labels: Labels,
}

impl MetricsScope {
    pub fn new(sink: Arc<dyn MetricsPort>, labels: Labels) -> Self {
        Self { sink, labels }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopMetrics), Labels::new())
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Same sink, labels extended with `key=value`.
    pub fn with(&self, key: &str, value: impl Into<String>) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            labels: self.labels.with(key, value),
        }
    }

    /// Same sink, labels replaced.
    pub fn relabel(&self, labels: Labels) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            labels,
        }
    }

    pub fn increment(&self, name: &str) {
        self.sink.increment_counter(name, &self.labels);
    }

    pub fn gauge(&self, name: &str, value: f64) {
        self.sink.set_gauge(name, value, &self.labels);
    }
}

impl Default for MetricsScope {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for MetricsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsScope")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}
