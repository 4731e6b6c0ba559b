//! Retry-wait derivation.
//!
//! Newer runtimes report the retry start in the retry block; older ones only
//! expose `last_retry_time` among the instance counters.

use chrono::{DateTime, Utc};

use crate::introspect::PluginSnapshot;

/// Seconds between the retry start and the next scheduled retry.
///
/// - no retry block: `None`, the gauge is left alone
/// - retry block with both timestamps resolvable: `next_time - start`, unclamped
/// - retry block missing either timestamp: `Some(0.0)`
pub fn retry_wait(snapshot: &PluginSnapshot) -> Option<f64> {
    let retry = snapshot.retry_state.as_ref()?;

    let start_time = retry.start_time.or_else(|| {
        snapshot
            .instance_counters
            .as_ref()
            .and_then(|counters| counters.last_retry_time)
    });

    let wait = match (retry.next_time, start_time) {
        (Some(next), Some(start)) => seconds_between(start, next),
        _ => 0.0,
    };
    Some(wait)
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        // Only on overflow, i.e. spans of ~290k years.
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}
