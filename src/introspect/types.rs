//! Plugin snapshot types returned by the introspection layer.
//!
//! Field presence varies across plugin-runtime versions. Every optional field
//! is modelled as `Option<_>`; `None` means "not reported", never an error.
//! A gauge-feeding field holding something other than a number reads as
//! `None`, so one bad value never discards the rest of the snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category value of plugins that are sampled.
pub const OUTPUT_CATEGORY: &str = "output";

/// Instance fields requested from the introspection layer on every tick.
///
/// `last_retry_time` is only reported by older runtimes and is used as the
/// retry start fallback.
pub const MONITOR_FIELDS: &[&str] = &[
    "num_errors",
    "emit_count",
    "last_retry_time",
    "emit_records",
    "write_count",
    "rollback_count",
];

/// Parameters for one introspection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRequest {
    /// Instance counter names to include.
    pub instance_fields: &'static [&'static str],
    /// Include retry-state detail.
    pub with_retry: bool,
}

impl InfoRequest {
    /// The request issued by the output sampler.
    pub fn monitor() -> Self {
        Self {
            instance_fields: MONITOR_FIELDS,
            with_retry: true,
        }
    }

    fn includes(&self, field: &str) -> bool {
        self.instance_fields.contains(&field)
    }
}

impl Default for InfoRequest {
    fn default() -> Self {
        Self::monitor()
    }
}

/// Retry bookkeeping of a plugin that is currently retrying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryState {
    /// When the current retry sequence started. Absent on older runtimes.
    #[serde(
        rename = "start",
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<DateTime<Utc>>,

    /// When the next retry is scheduled.
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_time: Option<DateTime<Utc>>,
}

impl RetryState {
    pub fn new(next_time: Option<DateTime<Utc>>, start_time: Option<DateTime<Utc>>) -> Self {
        Self {
            start_time,
            next_time,
        }
    }
}

/// Per-instance counters read from plugin internals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceCounters {
    #[serde(
        default,
        deserialize_with = "numeric::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_errors: Option<f64>,
    #[serde(
        default,
        deserialize_with = "numeric::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub emit_count: Option<f64>,
    #[serde(
        default,
        deserialize_with = "numeric::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub emit_records: Option<f64>,
    #[serde(
        default,
        deserialize_with = "numeric::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub write_count: Option<f64>,
    #[serde(
        default,
        deserialize_with = "numeric::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub rollback_count: Option<f64>,

    /// Legacy retry timestamp, only a fallback for [`RetryState::start_time`].
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_retry_time: Option<DateTime<Utc>>,
}

impl InstanceCounters {
    /// Drop every counter the request did not ask for.
    fn retain_requested(&mut self, request: &InfoRequest) {
        fn keep<T>(slot: &mut Option<T>, requested: bool) {
            if !requested {
                *slot = None;
            }
        }

        keep(&mut self.num_errors, request.includes("num_errors"));
        keep(&mut self.emit_count, request.includes("emit_count"));
        keep(&mut self.emit_records, request.includes("emit_records"));
        keep(&mut self.write_count, request.includes("write_count"));
        keep(&mut self.rollback_count, request.includes("rollback_count"));
        keep(&mut self.last_retry_time, request.includes("last_retry_time"));
    }
}

/// Point-in-time state of one managed plugin instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSnapshot {
    /// Unique instance identifier.
    pub plugin_id: String,
    /// Plugin category (`"input"`, `"filter"`, `"output"`, ...).
    pub plugin_category: String,
    /// Plugin type name (e.g. `"file"`, `"forward"`).
    #[serde(rename = "type")]
    pub plugin_type: String,

    #[serde(
        default,
        deserialize_with = "numeric::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub buffer_queue_length: Option<f64>,
    #[serde(
        default,
        deserialize_with = "numeric::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub buffer_total_queued_size: Option<f64>,
    #[serde(
        default,
        deserialize_with = "numeric::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_count: Option<f64>,

    /// Present only while the plugin has retry state to report.
    #[serde(rename = "retry", default, skip_serializing_if = "Option::is_none")]
    pub retry_state: Option<RetryState>,

    #[serde(
        rename = "instance_variables",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub instance_counters: Option<InstanceCounters>,
}

impl PluginSnapshot {
    /// Create a snapshot carrying only identity fields.
    pub fn new(
        plugin_id: impl Into<String>,
        plugin_category: impl Into<String>,
        plugin_type: impl Into<String>,
    ) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            plugin_category: plugin_category.into(),
            plugin_type: plugin_type.into(),
            buffer_queue_length: None,
            buffer_total_queued_size: None,
            retry_count: None,
            retry_state: None,
            instance_counters: None,
        }
    }

    /// Create an output-category snapshot.
    pub fn output(plugin_id: impl Into<String>, plugin_type: impl Into<String>) -> Self {
        Self::new(plugin_id, OUTPUT_CATEGORY, plugin_type)
    }

    /// Whether this instance is in scope for sampling.
    pub fn is_output(&self) -> bool {
        self.plugin_category == OUTPUT_CATEGORY
    }

    /// Shape the snapshot to what `request` asked for.
    #[must_use]
    pub fn restricted_to(mut self, request: &InfoRequest) -> Self {
        if !request.with_retry {
            self.retry_state = None;
        }
        if let Some(counters) = self.instance_counters.as_mut() {
            counters.retain_requested(request);
        }
        self
    }

    pub fn with_buffer_queue_length(mut self, length: f64) -> Self {
        self.buffer_queue_length = Some(length);
        self
    }

    pub fn with_buffer_total_queued_size(mut self, bytes: f64) -> Self {
        self.buffer_total_queued_size = Some(bytes);
        self
    }

    pub fn with_retry_count(mut self, count: f64) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn with_retry_state(mut self, retry: RetryState) -> Self {
        self.retry_state = Some(retry);
        self
    }

    pub fn with_instance_counters(mut self, counters: InstanceCounters) -> Self {
        self.instance_counters = Some(counters);
        self
    }
}

/// Gauge values arrive as numbers of any sign or precision.
mod numeric {
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawNumber {
        Number(f64),
        Other(IgnoredAny),
    }

    pub(super) fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawNumber>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawNumber::Number(value)) => Ok(Some(value)),
            Some(RawNumber::Other(_)) => {
                tracing::debug!("Ignoring non-numeric gauge value");
                Ok(None)
            }
        }
    }
}

/// Timestamps arrive either as RFC 3339 strings or as epoch seconds.
mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Epoch(f64),
        Text(DateTime<Utc>),
    }

    pub(super) fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawTimestamp::Text(ts)) => Ok(Some(ts)),
            Some(RawTimestamp::Epoch(secs)) => from_epoch_secs(secs)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}"))),
        }
    }

    pub(super) fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1_000_000_000.0).round() as u32;
        DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
    }
}
