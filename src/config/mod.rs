//! Configuration module for the output monitor.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Sampling interval
//! - Static base labels, with `${hostname}` placeholder expansion

mod app;
mod validation;

pub use app::{DEFAULT_INTERVAL, MonitorConfig};
pub use validation::{ConfigError, Placeholders, parse_duration, validate_label_name};
