//! Metrics recording utilities
//!
//! This module provides functions to record SalesLens metrics.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a report served from the cache
pub fn record_cache_hit(report: &'static str) {
    counter!("saleslens_cache_hits_total", "report" => report).increment(1);
}

/// Record a report that had to be computed
pub fn record_cache_miss(report: &'static str) {
    counter!("saleslens_cache_misses_total", "report" => report).increment(1);
}

/// Record a cached payload that could not be decoded
pub fn record_cache_decode_failure(report: &'static str) {
    counter!("saleslens_cache_decode_failures_total", "report" => report).increment(1);
}

/// Record how long a report request took, cache lookup included
pub fn record_report(report: &'static str, duration: Duration, success: bool) {
    let labels = [
        ("report", report.to_string()),
        ("status", if success { "ok" } else { "error" }.to_string()),
    ];

    histogram!("saleslens_report_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record a request rejected by validation
pub fn record_validation_error(operation: &'static str) {
    counter!("saleslens_validation_errors_total", "operation" => operation).increment(1);
}

/// Record a goal update
pub fn record_goal_update() {
    counter!("saleslens_goal_updates_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_cache_hit("sales_overview");
        record_cache_miss("sales_overview");
        record_cache_decode_failure("sales_overview");
        record_report("sales_overview", Duration::from_millis(3), true);
        record_validation_error("top_products");
        record_goal_update();
    }
}
