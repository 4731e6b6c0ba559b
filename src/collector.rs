//! Collector Layer
//!
//! Periodic collection framework. A [`Collector`] is driven by a
//! [`Scheduler`] on a dedicated thread, isolated from the host; failures of a
//! single tick are logged and never stop the schedule.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for implementing collectors
//! - [`Scheduler`]: Fixed-interval timer with graceful shutdown
//! - [`output`]: Output plugin status collector
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use output_monitor::collector::Scheduler;
//! use output_monitor::collector::output::{LabelBuilder, OutputSampler};
//! use output_monitor::introspect::StaticIntrospector;
//! use output_monitor::metrics::OutputMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = prometheus::Registry::new();
//! let labels = LabelBuilder::default();
//! let metrics = OutputMetrics::register(&registry, &labels.label_names())?;
//! let sampler = OutputSampler::new(Arc::new(StaticIntrospector::default()), labels, metrics);
//!
//! let mut scheduler = Scheduler::new(Duration::from_secs(5));
//! scheduler.start(Arc::new(sampler))?;
//! scheduler.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod output;
mod scheduler;
mod traits;

pub use scheduler::{Scheduler, SchedulerState};
pub use traits::{Collector, CollectorError, SchedulerError};
