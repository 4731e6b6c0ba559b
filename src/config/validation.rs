//! Configuration validation utilities.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::metrics::MetricsError;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),

    /// Registering the output metrics failed.
    #[error("metric registration error: {0}")]
    MetricsError(#[from] MetricsError),
}

/// Parse duration string using humantime.
///
/// Supports various formats: `5s`, `1m`, `1m30s`, `500ms`, etc.
///
/// # Examples
///
/// ```
/// use output_monitor::config::parse_duration;
///
/// assert_eq!(parse_duration("5s").unwrap().as_secs(), 5);
/// assert_eq!(parse_duration("1m").unwrap().as_secs(), 60);
/// assert_eq!(parse_duration("500ms").unwrap().as_millis(), 500);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Check that `name` is usable as a static label name.
///
/// Label names follow the Prometheus data model; names starting with `__`
/// are reserved.
pub fn validate_label_name(name: &str) -> Result<(), ConfigError> {
    static LABEL_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

    let regex = LABEL_NAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("failed to compile label name regex")
    });

    if !regex.is_match(name) {
        return Err(ConfigError::ValidationError(format!(
            "invalid label name: '{}'",
            name
        )));
    }
    if name.starts_with("__") {
        return Err(ConfigError::ValidationError(format!(
            "label name '{}' is reserved",
            name
        )));
    }
    Ok(())
}

/// Values substituted for `${name}` placeholders in label values.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: BTreeMap<String, String>,
}

impl Placeholders {
    /// Placeholder name for the local host name.
    pub const HOSTNAME: &'static str = "hostname";

    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholders resolved from the local host (currently `${hostname}`).
    pub fn from_host() -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        Self::new().with(Self::HOSTNAME, hostname)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Replace every known `${name}` in `input`.
    ///
    /// Unknown placeholders are left verbatim and logged.
    pub fn expand(&self, input: &str) -> String {
        static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

        let regex = PLACEHOLDER_REGEX.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
                .expect("failed to compile placeholder regex")
        });

        regex
            .replace_all(input, |caps: &regex::Captures| {
                let name = &caps[1];
                match self.values.get(name) {
                    Some(value) => value.clone(),
                    None => {
                        tracing::warn!(placeholder = %name, "Unknown placeholder in label value");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}
