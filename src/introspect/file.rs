//! JSON file backed introspector.
//!
//! Reads a JSON array of plugin snapshots on every query, so an external
//! process can refresh the file between ticks. Entries that do not parse as
//! a snapshot are skipped with a warning; the rest of the batch is kept.

use std::path::{Path, PathBuf};

use super::traits::{IntrospectionError, Introspector};
use super::types::{InfoRequest, PluginSnapshot};

/// Introspector that replays snapshots from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileIntrospector {
    path: PathBuf,
}

impl JsonFileIntrospector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Introspector for JsonFileIntrospector {
    fn plugins_info_all(
        &self,
        request: &InfoRequest,
    ) -> Result<Vec<PluginSnapshot>, IntrospectionError> {
        let content = std::fs::read_to_string(&self.path)?;
        let entries: Vec<serde_json::Value> = serde_json::from_str(&content)?;

        let mut snapshots = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<PluginSnapshot>(entry) {
                Ok(snapshot) => snapshots.push(snapshot.restricted_to(request)),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        index,
                        error = %e,
                        "Skipping malformed plugin snapshot"
                    );
                }
            }
        }

        Ok(snapshots)
    }
}
