//! Label construction for output plugin series.

use std::collections::BTreeSet;

use crate::introspect::PluginSnapshot;
use crate::metrics::LabelSet;

/// Label carrying the plugin instance id.
pub const PLUGIN_ID_LABEL: &str = "plugin_id";

/// Label carrying the plugin type.
pub const TYPE_LABEL: &str = "type";

/// Builds the label set of each sampled plugin instance.
///
/// Base labels come from configuration and are fixed for the process
/// lifetime. Instance identity overrides a base label of the same name.
#[derive(Debug, Clone, Default)]
pub struct LabelBuilder {
    base: LabelSet,
}

impl LabelBuilder {
    pub fn new(base: LabelSet) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &LabelSet {
        &self.base
    }

    /// Sorted, de-duplicated names of every label [`labels`](Self::labels) emits.
    pub fn label_names(&self) -> Vec<String> {
        self.base
            .keys()
            .map(String::as_str)
            .chain([PLUGIN_ID_LABEL, TYPE_LABEL])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Label set for `snapshot`.
    pub fn labels(&self, snapshot: &PluginSnapshot) -> LabelSet {
        let mut labels = self.base.clone();
        labels.insert(PLUGIN_ID_LABEL.to_string(), snapshot.plugin_id.clone());
        labels.insert(TYPE_LABEL.to_string(), snapshot.plugin_type.clone());
        labels
    }
}
