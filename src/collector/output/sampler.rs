//! Output plugin sampler.
//!
//! Pulls one snapshot list per tick and writes the reported values into the
//! output status gauges.

use std::sync::Arc;

use crate::collector::{Collector, CollectorError};
use crate::introspect::{InfoRequest, Introspector, PluginSnapshot};
use crate::metrics::{LabelSet, MetricKey, OutputMetrics};

use super::labels::LabelBuilder;
use super::retry::retry_wait;

/// Outcome of one [`OutputSampler::sample`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleReport {
    /// Output plugins sampled.
    pub outputs: usize,
    /// Non-output plugins ignored.
    pub ignored: usize,
    /// Gauge values written.
    pub writes: usize,
    /// Gauge writes rejected by the metric table.
    pub failed_writes: usize,
}

/// Samples output plugins into [`OutputMetrics`].
pub struct OutputSampler {
    introspector: Arc<dyn Introspector>,
    labels: LabelBuilder,
    metrics: OutputMetrics,
    request: InfoRequest,
}

impl OutputSampler {
    pub fn new(
        introspector: Arc<dyn Introspector>,
        labels: LabelBuilder,
        metrics: OutputMetrics,
    ) -> Self {
        Self {
            introspector,
            labels,
            metrics,
            request: InfoRequest::monitor(),
        }
    }

    pub fn labels(&self) -> &LabelBuilder {
        &self.labels
    }

    pub fn metrics(&self) -> &OutputMetrics {
        &self.metrics
    }

    /// Run one sampling pass.
    ///
    /// # Errors
    /// Returns `CollectorError::Introspection` if the snapshot query fails.
    /// Problems with a single plugin never fail the pass.
    pub fn sample(&self) -> Result<SampleReport, CollectorError> {
        let snapshots = self.introspector.plugins_info_all(&self.request)?;
        let mut report = SampleReport::default();

        for snapshot in &snapshots {
            if !snapshot.is_output() {
                report.ignored += 1;
                continue;
            }
            report.outputs += 1;
            self.update(snapshot, &mut report);
        }

        Ok(report)
    }

    fn update(&self, snapshot: &PluginSnapshot, report: &mut SampleReport) {
        let labels = self.labels.labels(snapshot);

        let direct = [
            (MetricKey::BufferQueueLength, snapshot.buffer_queue_length),
            (
                MetricKey::BufferTotalQueuedSize,
                snapshot.buffer_total_queued_size,
            ),
            (MetricKey::RetryCount, snapshot.retry_count),
        ];
        for (key, value) in direct {
            if let Some(value) = value {
                self.write(key, &labels, value, snapshot, report);
            }
        }

        if let Some(counters) = &snapshot.instance_counters {
            let counters = [
                (MetricKey::NumErrors, counters.num_errors),
                (MetricKey::WriteCount, counters.write_count),
                (MetricKey::EmitCount, counters.emit_count),
                (MetricKey::EmitRecords, counters.emit_records),
                (MetricKey::RollbackCount, counters.rollback_count),
            ];
            for (key, value) in counters {
                if let Some(value) = value {
                    self.write(key, &labels, value, snapshot, report);
                }
            }
        }

        if let Some(wait) = retry_wait(snapshot) {
            self.write(MetricKey::RetryWait, &labels, wait, snapshot, report);
        }
    }

    fn write(
        &self,
        key: MetricKey,
        labels: &LabelSet,
        value: f64,
        snapshot: &PluginSnapshot,
        report: &mut SampleReport,
    ) {
        match self.metrics.set(key, labels, value) {
            Ok(()) => report.writes += 1,
            Err(e) => {
                report.failed_writes += 1;
                tracing::debug!(
                    plugin_id = %snapshot.plugin_id,
                    metric = %key,
                    error = %e,
                    "Skipping gauge write"
                );
            }
        }
    }
}

impl Collector for OutputSampler {
    fn name(&self) -> &str {
        "output_monitor"
    }

    fn collect(&self) -> Result<(), CollectorError> {
        let report = self.sample()?;
        tracing::debug!(
            outputs = report.outputs,
            ignored = report.ignored,
            writes = report.writes,
            failed_writes = report.failed_writes,
            "Output status sampled"
        );
        Ok(())
    }
}

impl std::fmt::Debug for OutputSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSampler")
            .field("labels", &self.labels)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
