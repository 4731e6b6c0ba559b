//! Introspection Layer
//!
//! Typed view of the plugin runtime's introspection data. The runtime itself
//! is an external collaborator reached through the [`Introspector`] trait.
//!
//! # Components
//!
//! - [`PluginSnapshot`]: One plugin instance's state, all optional fields as `Option`
//! - [`InfoRequest`]: Which instance fields and retry detail to include
//! - [`Introspector`]: Synchronous query seam consumed by the sampler
//! - [`StaticIntrospector`] / [`JsonFileIntrospector`]: In-memory and file-backed sources

mod file;
mod traits;
mod types;

pub use file::JsonFileIntrospector;
pub use traits::{IntrospectionError, Introspector, StaticIntrospector};
pub use types::{
    InfoRequest, InstanceCounters, MONITOR_FIELDS, OUTPUT_CATEGORY, PluginSnapshot, RetryState,
};
