//! Metric names and one-time descriptions.
//!
//! Series are emitted through the `metrics` facade; without an installed
//! recorder they are no-ops. Install any exporter (e.g. Prometheus) in the host
//! process to scrape them.

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub const AI_CALLS: &str = "importance_ai_calls_total";
pub const AI_FAILURES: &str = "importance_ai_failures_total";
pub const AI_LATENCY_MS: &str = "importance_ai_latency_ms";
pub const LOCAL_FALLBACK: &str = "importance_local_fallback_total";
pub const QUOTA_TRIPS: &str = "importance_quota_trips_total";
pub const ANALYSIS_RUNS: &str = "analysis_runs_total";
pub const ANALYSIS_REJECTED: &str = "analysis_rejected_total";

/// One-time metrics registration (so series carry descriptions once exported).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(AI_CALLS, "Importance requests sent to the text-generation provider.");
        describe_counter!(
            AI_FAILURES,
            "Importance requests that failed, timed out or returned unusable text."
        );
        describe_histogram!(AI_LATENCY_MS, "Provider round-trip time in milliseconds.");
        describe_counter!(
            LOCAL_FALLBACK,
            "Weight maps produced entirely by the local heuristic."
        );
        describe_counter!(
            QUOTA_TRIPS,
            "Resolvers that switched to local mode after a quota error."
        );
        describe_counter!(ANALYSIS_RUNS, "Completed analysis runs.");
        describe_counter!(
            ANALYSIS_REJECTED,
            "Analysis requests rejected for lack of usable records."
        );
    });
}
