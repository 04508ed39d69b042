//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Notifications received, by event kind
//! - Transfer attempts and retries
//! - Integrity mismatches
//! - Replicated objects and bytes
//! - Delete propagation
//! - Terminal failures
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replication_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Histograms track distributions (duration, size)
//!
//! No recorder is installed here; without one every call is a no-op.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a change descriptor entering the dispatcher.
pub fn record_event_received(kind: &str) {
    counter!("replication_events_received_total", "kind" => kind.to_string()).increment(1);
}

/// Record the outcome of one transfer attempt.
pub fn record_transfer_attempt(outcome: &str) {
    counter!("replication_transfer_attempts_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a retry being scheduled, with the backoff it will wait.
pub fn record_transfer_retry(attempt: u32, delay: Duration) {
    counter!("replication_transfer_retries_total").increment(1);
    histogram!("replication_transfer_backoff_seconds", "attempt" => attempt.to_string())
        .record(delay.as_secs_f64());
}

/// Record a destination digest that did not match the source.
pub fn record_integrity_mismatch() {
    counter!("replication_integrity_mismatches_total").increment(1);
}

/// Record a successfully replicated object.
pub fn record_object_replicated(bytes: u64, duration: Duration) {
    counter!("replication_objects_replicated_total").increment(1);
    counter!("replication_bytes_replicated_total").increment(bytes);
    histogram!("replication_transfer_duration_seconds").record(duration.as_secs_f64());
}

/// Record the attempts a completed copy needed.
pub fn record_attempts_used(attempts: u32) {
    histogram!("replication_attempts_per_object").record(f64::from(attempts));
}

/// Record a delete propagated to the destination.
pub fn record_delete(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("replication_deletes_total", "status" => status).increment(1);
}

/// Record a failure surfaced to the trigger source.
pub fn record_terminal_failure(path: &str) {
    counter!("replication_terminal_failures_total", "path" => path.to_string()).increment(1);
}
