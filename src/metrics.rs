//! Output status gauges.
//!
//! A fixed table of [`GaugeVec`]s registered once against a shared
//! [`Registry`]. The registry handle is injected by the host, which also owns
//! the exporter that serves it. Values are last-write-wins per label set;
//! series are never deleted.

use std::collections::{BTreeMap, HashMap};

use prometheus::core::Collector as _;
use prometheus::{GaugeVec, Opts, Registry};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};
use thiserror::Error;

/// Label name → value identifying one series.
pub type LabelSet = BTreeMap<String, String>;

/// Errors raised by the gauge table.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registering a gauge in the shared registry failed (e.g. duplicate name).
    #[error("failed to register metric '{name}': {source}")]
    Registration {
        name: &'static str,
        #[source]
        source: prometheus::Error,
    },

    /// A label set did not match the registered label names.
    #[error("invalid labels for metric '{name}': {source}")]
    Labels {
        name: &'static str,
        #[source]
        source: prometheus::Error,
    },
}

/// Logical key of each gauge in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKey {
    BufferQueueLength,
    BufferTotalQueuedSize,
    RetryCount,
    NumErrors,
    EmitCount,
    EmitRecords,
    WriteCount,
    RollbackCount,
    RetryWait,
}

impl MetricKey {
    /// Exported metric name.
    pub fn metric_name(self) -> &'static str {
        match self {
            Self::BufferQueueLength => "fluentd_output_status_buffer_queue_length",
            Self::BufferTotalQueuedSize => "fluentd_output_status_buffer_total_bytes",
            Self::RetryCount => "fluentd_output_status_retry_count",
            Self::NumErrors => "fluentd_output_status_num_errors",
            Self::EmitCount => "fluentd_output_status_emit_count",
            Self::EmitRecords => "fluentd_output_status_emit_records",
            Self::WriteCount => "fluentd_output_status_write_count",
            Self::RollbackCount => "fluentd_output_status_rollback_count",
            Self::RetryWait => "fluentd_output_status_retry_wait",
        }
    }

    /// Help string registered with the metric.
    pub fn help(self) -> &'static str {
        match self {
            Self::BufferQueueLength => "Current buffer queue length.",
            Self::BufferTotalQueuedSize => "Current total size of queued buffers.",
            Self::RetryCount => "Current retry counts.",
            Self::NumErrors => "Current number of errors.",
            Self::EmitCount => "Current emit counts.",
            Self::EmitRecords => "Current emit records.",
            Self::WriteCount => "Current write counts.",
            Self::RollbackCount => "Current rollback counts.",
            Self::RetryWait => "Current retry wait",
        }
    }
}

/// One gauge per [`MetricKey`].
#[derive(Clone)]
struct Gauges {
    buffer_queue_length: GaugeVec,
    buffer_total_queued_size: GaugeVec,
    retry_count: GaugeVec,
    num_errors: GaugeVec,
    emit_count: GaugeVec,
    emit_records: GaugeVec,
    write_count: GaugeVec,
    rollback_count: GaugeVec,
    retry_wait: GaugeVec,
}

impl Gauges {
    fn new(label_names: &[&str]) -> Result<Self, MetricsError> {
        let gauge = |key: MetricKey| {
            GaugeVec::new(Opts::new(key.metric_name(), key.help()), label_names).map_err(
                |source| MetricsError::Registration {
                    name: key.metric_name(),
                    source,
                },
            )
        };

        Ok(Self {
            buffer_queue_length: gauge(MetricKey::BufferQueueLength)?,
            buffer_total_queued_size: gauge(MetricKey::BufferTotalQueuedSize)?,
            retry_count: gauge(MetricKey::RetryCount)?,
            num_errors: gauge(MetricKey::NumErrors)?,
            emit_count: gauge(MetricKey::EmitCount)?,
            emit_records: gauge(MetricKey::EmitRecords)?,
            write_count: gauge(MetricKey::WriteCount)?,
            rollback_count: gauge(MetricKey::RollbackCount)?,
            retry_wait: gauge(MetricKey::RetryWait)?,
        })
    }

    fn get(&self, key: MetricKey) -> &GaugeVec {
        match key {
            MetricKey::BufferQueueLength => &self.buffer_queue_length,
            MetricKey::BufferTotalQueuedSize => &self.buffer_total_queued_size,
            MetricKey::RetryCount => &self.retry_count,
            MetricKey::NumErrors => &self.num_errors,
            MetricKey::EmitCount => &self.emit_count,
            MetricKey::EmitRecords => &self.emit_records,
            MetricKey::WriteCount => &self.write_count,
            MetricKey::RollbackCount => &self.rollback_count,
            MetricKey::RetryWait => &self.retry_wait,
        }
    }
}

/// The output status gauge table.
///
/// Cloning is cheap; clones share the same underlying gauges.
#[derive(Clone)]
pub struct OutputMetrics {
    gauges: Gauges,
    label_names: Vec<String>,
}

impl OutputMetrics {
    /// Create every gauge and register it in `registry`.
    ///
    /// # Errors
    /// Returns `MetricsError::Registration` if a name is already registered or
    /// a label name is invalid. The gauges this call registered before the
    /// failure are unregistered again.
    pub fn register(registry: &Registry, label_names: &[String]) -> Result<Self, MetricsError> {
        let names: Vec<&str> = label_names.iter().map(String::as_str).collect();
        let gauges = Gauges::new(&names)?;

        let mut registered: Vec<&GaugeVec> = Vec::new();
        for key in MetricKey::iter() {
            let gauge = gauges.get(key);
            if let Err(source) = registry.register(Box::new(gauge.clone())) {
                for gauge in registered {
                    if let Err(e) = registry.unregister(Box::new(gauge.clone())) {
                        tracing::warn!(error = %e, "Failed to roll back metric registration");
                    }
                }
                return Err(MetricsError::Registration {
                    name: key.metric_name(),
                    source,
                });
            }
            registered.push(gauge);
        }

        tracing::debug!(
            metrics = registered.len(),
            labels = ?label_names,
            "Output status metrics registered"
        );

        Ok(Self {
            gauges,
            label_names: label_names.to_vec(),
        })
    }

    /// Label names every series of this table carries.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Overwrite the value of `key` for `labels`.
    pub fn set(&self, key: MetricKey, labels: &LabelSet, value: f64) -> Result<(), MetricsError> {
        let labels: HashMap<&str, &str> = labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.gauge(key)
            .get_metric_with(&labels)
            .map_err(|source| MetricsError::Labels {
                name: key.metric_name(),
                source,
            })?
            .set(value);
        Ok(())
    }

    /// Current value of `key` for `labels`, or `None` if that series was never set.
    ///
    /// Does not create the series.
    pub fn get(&self, key: MetricKey, labels: &LabelSet) -> Option<f64> {
        self.gauge(key)
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == labels.len()
                    && pairs
                        .iter()
                        .all(|pair| labels.get(pair.get_name()).map(String::as_str) == Some(pair.get_value()))
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    fn gauge(&self, key: MetricKey) -> &GaugeVec {
        self.gauges.get(key)
    }
}

impl std::fmt::Debug for OutputMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputMetrics")
            .field("label_names", &self.label_names)
            .finish()
    }
}
