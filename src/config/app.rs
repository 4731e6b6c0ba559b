//! Monitor configuration structures.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::metrics::LabelSet;

use super::validation::{ConfigError, Placeholders, validate_label_name};

// =============================================================================
// Constants
// =============================================================================

/// Default sampling interval (5 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

// =============================================================================
// Monitor Configuration
// =============================================================================

/// Output monitor configuration.
///
/// ```yaml
/// interval: 5s
/// labels:
///   region: us
///   host: ${hostname}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Sampling interval (default: 5s, must be non-zero).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Static labels added to every series. Values may contain `${hostname}`.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            labels: BTreeMap::new(),
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "interval must be positive".to_string(),
            ));
        }

        for name in self.labels.keys() {
            validate_label_name(name)?;
        }

        Ok(())
    }

    /// Base labels with placeholders expanded.
    pub fn base_labels(&self, placeholders: &Placeholders) -> LabelSet {
        self.labels
            .iter()
            .map(|(name, value)| (name.clone(), placeholders.expand(value)))
            .collect()
    }

    /// Set the sampling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Add a static label.
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }
}
