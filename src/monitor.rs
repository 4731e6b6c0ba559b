//! Host-facing lifecycle of the output monitor.
//!
//! The host calls [`OutputMonitor::configure`] once, then
//! [`start`](OutputMonitor::start) and finally
//! [`shutdown`](OutputMonitor::shutdown). Nothing else is exposed to it.

use std::sync::Arc;

use prometheus::Registry;

use crate::collector::output::{LabelBuilder, OutputSampler};
use crate::collector::{Scheduler, SchedulerError, SchedulerState};
use crate::config::{ConfigError, MonitorConfig, Placeholders};
use crate::introspect::Introspector;
use crate::metrics::OutputMetrics;

/// Background poller publishing output plugin status as gauges.
#[derive(Debug)]
pub struct OutputMonitor {
    config: MonitorConfig,
    sampler: Arc<OutputSampler>,
    scheduler: Scheduler,
}

impl OutputMonitor {
    /// Validate `config`, resolve base labels and register the gauges in `registry`.
    ///
    /// `${hostname}` in label values is resolved here, once.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid configuration or if any gauge name is
    /// already registered in `registry`.
    pub fn configure(
        config: MonitorConfig,
        registry: &Registry,
        introspector: Arc<dyn Introspector>,
    ) -> Result<Self, ConfigError> {
        Self::configure_with(config, registry, introspector, &Placeholders::from_host())
    }

    /// Like [`configure`](Self::configure) with explicit placeholder values.
    pub fn configure_with(
        config: MonitorConfig,
        registry: &Registry,
        introspector: Arc<dyn Introspector>,
        placeholders: &Placeholders,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let labels = LabelBuilder::new(config.base_labels(placeholders));
        let metrics = OutputMetrics::register(registry, &labels.label_names())?;
        let sampler = Arc::new(OutputSampler::new(introspector, labels, metrics));
        let scheduler = Scheduler::new(config.interval);

        tracing::info!(
            interval = ?config.interval,
            labels = ?sampler.labels().base(),
            "Output monitor configured"
        );

        Ok(Self {
            config,
            sampler,
            scheduler,
        })
    }

    /// Begin periodic sampling on the background thread.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        self.scheduler.start(Arc::clone(&self.sampler))
    }

    /// Stop sampling and wait for an in-flight sample to finish.
    pub fn shutdown(&mut self) -> Result<(), SchedulerError> {
        self.scheduler.shutdown()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// The sampler driven by the scheduler.
    pub fn sampler(&self) -> &OutputSampler {
        &self.sampler
    }
}
