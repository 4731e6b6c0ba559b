//! The introspection seam and an in-memory implementation.

use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use super::types::{InfoRequest, PluginSnapshot};

/// Errors raised by an introspection source.
#[derive(Debug, Error)]
pub enum IntrospectionError {
    /// Reading the source failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The source returned a payload that is not a snapshot list.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source is currently unable to answer.
    #[error("introspection unavailable: {0}")]
    Unavailable(String),
}

/// A queryable source of plugin snapshots.
///
/// Called synchronously once per tick from the scheduler thread, for the
/// lifetime of the process. A call that blocks stalls all later ticks.
pub trait Introspector: Send + Sync + 'static {
    /// Return a snapshot of every managed plugin instance.
    fn plugins_info_all(
        &self,
        request: &InfoRequest,
    ) -> Result<Vec<PluginSnapshot>, IntrospectionError>;
}

/// Introspector backed by a replaceable in-memory snapshot list.
///
/// Useful when the host already holds plugin state and pushes it in.
#[derive(Debug, Default)]
pub struct StaticIntrospector {
    snapshots: RwLock<Vec<PluginSnapshot>>,
}

impl StaticIntrospector {
    pub fn new(snapshots: Vec<PluginSnapshot>) -> Self {
        Self {
            snapshots: RwLock::new(snapshots),
        }
    }

    /// Replace the snapshot list returned by later queries.
    pub fn replace(&self, snapshots: Vec<PluginSnapshot>) {
        *self
            .snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshots;
    }

    /// Number of snapshots currently held.
    pub fn len(&self) -> usize {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Introspector for StaticIntrospector {
    fn plugins_info_all(
        &self,
        request: &InfoRequest,
    ) -> Result<Vec<PluginSnapshot>, IntrospectionError> {
        let snapshots = self
            .snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(snapshots
            .iter()
            .cloned()
            .map(|s| s.restricted_to(request))
            .collect())
    }
}
