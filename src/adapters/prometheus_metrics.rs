//! Metrics sink backed by the `metrics` facade, rendered in the Prometheus
//! text exposition format.
//!
//! `FacadeMetrics` forwards to whichever recorder is active: the global one,
//! or one scoped to a closure by [`PrometheusRun::record`]. With no recorder
//! the observations are dropped.

use std::fs;
use std::path::Path;

use metrics::{Label, counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::domain::error::SignalbenchError;
use crate::ports::metrics_port::{Labels, MetricsPort};

#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeMetrics;

impl FacadeMetrics {
    pub fn new() -> Self {
        Self
    }
}

fn metric_labels(labels: &Labels) -> Vec<Label> {
    labels
        .iter()
        .map(|(key, value)| Label::new(key.to_string(), value.to_string()))
        .collect()
}

impl MetricsPort for FacadeMetrics {
    fn increment_counter(&self, name: &str, labels: &Labels) {
        counter!(name.to_string(), metric_labels(labels)).increment(1);
    }

    fn set_gauge(&self, name: &str, value: f64, labels: &Labels) {
        gauge!(name.to_string(), metric_labels(labels)).set(value);
    }
}

/// A Prometheus recorder owned by one backtest run rather than installed
/// process-wide.
pub struct PrometheusRun {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl PrometheusRun {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self { recorder, handle }
    }

    /// Runs `f` with this run's recorder receiving every facade metric
    /// emitted on the current thread.
    pub fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(&self.recorder, f)
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Writes the exposition text to `path`, e.g. for a node exporter
    /// textfile collector.
    pub fn write(&self, path: &Path) -> Result<(), SignalbenchError> {
        fs::write(path, self.render()).map_err(|e| SignalbenchError::Report {
            reason: format!("failed to write metrics to {}: {}", path.display(), e),
        })
    }
}

impl Default for PrometheusRun {
    fn default() -> Self {
        Self::new()
    }
}
