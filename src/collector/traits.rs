//! Core collector traits and error types.

use std::time::Duration;

use thiserror::Error;

use crate::introspect::IntrospectionError;

use super::scheduler::SchedulerState;

/// Errors that can occur during one collection cycle.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The introspection source failed to answer.
    #[error("introspection failed: {0}")]
    Introspection(#[from] IntrospectionError),
}

/// Errors raised by the scheduler lifecycle.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start` was called outside the idle state.
    #[error("cannot start scheduler in state '{0}'")]
    InvalidState(SchedulerState),

    /// A zero interval cannot drive a timer.
    #[error("scheduler interval must be greater than zero")]
    ZeroInterval,

    /// The dedicated scheduler thread could not be spawned.
    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The in-flight tick did not finish within the shutdown timeout.
    #[error("scheduler shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    /// The scheduler thread terminated by panicking.
    #[error("scheduler thread panicked")]
    Panicked,
}

/// Core collector trait driven by the [`Scheduler`](super::Scheduler).
///
/// `collect()` runs synchronously on the scheduler thread and is never
/// invoked concurrently with itself.
///
/// # Error Handling Philosophy
///
/// - **Missing data** (a plugin that does not report a field): not an error.
///   The collector skips that value and returns `Ok(())`.
/// - **Collector errors** (introspection source unavailable): returned as
///   `Err(CollectorError)`. The scheduler logs them and keeps ticking, so the
///   only visible effect is that this tick's values were not refreshed.
pub trait Collector: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Perform one collection cycle.
    fn collect(&self) -> Result<(), CollectorError>;
}
