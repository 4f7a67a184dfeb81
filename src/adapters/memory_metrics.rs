//! In-memory metrics sink, for inspecting what a run emitted.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::ports::metrics_port::{Labels, MetricsPort};

type SeriesKey = (String, Labels);

#[derive(Debug, Default)]
struct Series {
    counters: BTreeMap<SeriesKey, u64>,
    gauges: BTreeMap<SeriesKey, f64>,
}

/// Records every counter increment and the latest value of every gauge,
/// keyed by metric name and label set.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    series: Mutex<Series>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Series> {
        self.series.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn counter(&self, name: &str, labels: &Labels) -> u64 {
        self.lock()
            .counters
            .get(&(name.to_string(), labels.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn gauge(&self, name: &str, labels: &Labels) -> Option<f64> {
        self.lock()
            .gauges
            .get(&(name.to_string(), labels.clone()))
            .copied()
    }

    /// Counter totals per metric name.
    pub fn counter_totals(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for ((name, _), count) in &self.lock().counters {
            *totals.entry(name.clone()).or_insert(0) += count;
        }
        totals
    }
}

impl MetricsPort for InMemoryMetrics {
    fn increment_counter(&self, name: &str, labels: &Labels) {
        *self
            .lock()
            .counters
            .entry((name.to_string(), labels.clone()))
            .or_insert(0) += 1;
    }

    fn set_gauge(&self, name: &str, value: f64, labels: &Labels) {
        self.lock()
            .gauges
            .insert((name.to_string(), labels.clone()), value);
    }
}
