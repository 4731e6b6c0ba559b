//! Output Monitor - Output Plugin Status Exporter
//!
//! Samples the runtime state of a pipeline host's output plugins (buffer
//! depth, retry counters, error/write/emit counts) on a fixed interval and
//! republishes it as labeled Prometheus gauges. Serving the registry is left
//! to the host's exporter.
//!
//! # Architecture
//!
//! - **Introspection**: Typed, version-tolerant plugin snapshots behind the [`Introspector`] trait
//! - **Metrics**: Fixed gauge table registered once in a shared registry
//! - **Collector**: Output sampler plus a fixed-interval scheduler on a dedicated thread
//! - **Config**: YAML configuration with base labels and `${hostname}` expansion
//! - **Monitor**: Host lifecycle (`configure` → `start` → `shutdown`)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use output_monitor::{MonitorConfig, OutputMonitor, PluginSnapshot, StaticIntrospector};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = prometheus::Registry::new();
//!     let introspector = Arc::new(StaticIntrospector::new(vec![
//!         PluginSnapshot::output("out1", "file").with_buffer_queue_length(3.0),
//!     ]));
//!     let config = MonitorConfig::new().with_label("region", "us");
//!
//!     let mut monitor = OutputMonitor::configure(config, &registry, introspector)?;
//!     monitor.start()?;
//!     // ... host runs, exporter scrapes `registry` ...
//!     monitor.shutdown()?;
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod introspect;
pub mod metrics;
pub mod monitor;

pub use collector::output::{LabelBuilder, OutputSampler, SampleReport, retry_wait};
pub use collector::{Collector, CollectorError, Scheduler, SchedulerError, SchedulerState};
pub use config::{ConfigError, MonitorConfig, Placeholders};
pub use introspect::{
    InfoRequest, InstanceCounters, IntrospectionError, Introspector, JsonFileIntrospector,
    PluginSnapshot, RetryState, StaticIntrospector,
};
pub use metrics::{LabelSet, MetricKey, MetricsError, OutputMetrics};
pub use monitor::OutputMonitor;
