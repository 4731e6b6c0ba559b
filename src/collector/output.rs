//! Output plugin status collector.
//!
//! - [`OutputSampler`]: Per-tick sampling of output plugins into gauges
//! - [`LabelBuilder`]: Stable per-instance label sets
//! - [`retry_wait`]: Retry-wait derivation across runtime versions

mod labels;
mod retry;
mod sampler;

pub use labels::{LabelBuilder, PLUGIN_ID_LABEL, TYPE_LABEL};
pub use retry::retry_wait;
pub use sampler::{OutputSampler, SampleReport};
