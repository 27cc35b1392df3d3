//! Prometheus metrics for the tenancy layer

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

// Server metrics
const METRIC_UPTIME: &str = "yacht_tenancy_uptime_seconds";
const METRIC_INFO: &str = "yacht_tenancy_info";
const METRIC_REQUESTS: &str = "yacht_tenancy_requests_total";
const METRIC_REQUEST_DURATION: &str = "yacht_tenancy_request_duration_seconds";

// Cache metrics
const METRIC_CACHE_HITS: &str = "yacht_tenancy_cache_hits_total";
const METRIC_CACHE_MISSES: &str = "yacht_tenancy_cache_misses_total";
const METRIC_CACHE_COALESCED: &str = "yacht_tenancy_cache_coalesced_total";
const METRIC_CACHE_COMPUTE_FAILURES: &str = "yacht_tenancy_cache_compute_failures_total";
const METRIC_CACHE_INVALIDATIONS: &str = "yacht_tenancy_cache_invalidations_total";
const METRIC_CACHE_INVALIDATED_ENTRIES: &str = "yacht_tenancy_cache_invalidated_entries_total";
const METRIC_CACHE_SIZE: &str = "yacht_tenancy_cache_entries";

// Isolation metrics
const METRIC_VIOLATIONS: &str = "yacht_tenancy_isolation_violations_total";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();
    START_TIME.set(Instant::now()).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_gauge!(METRIC_UPTIME, "Server uptime in seconds");
    describe_gauge!(METRIC_INFO, "Server information (always 1)");
    describe_counter!(METRIC_REQUESTS, "Total HTTP requests by route and status");
    describe_histogram!(METRIC_REQUEST_DURATION, "Request handling duration in seconds");

    describe_counter!(METRIC_CACHE_HITS, "Reads served from the cache");
    describe_counter!(METRIC_CACHE_MISSES, "Reads that ran the compute closure");
    describe_counter!(
        METRIC_CACHE_COALESCED,
        "Reads that waited on another caller's computation"
    );
    describe_counter!(METRIC_CACHE_COMPUTE_FAILURES, "Failed compute closures");
    describe_counter!(METRIC_CACHE_INVALIDATIONS, "Tag invalidations issued");
    describe_counter!(
        METRIC_CACHE_INVALIDATED_ENTRIES,
        "Entries removed by tag invalidation"
    );
    describe_gauge!(METRIC_CACHE_SIZE, "Current cache size (entries)");

    describe_counter!(METRIC_VIOLATIONS, "Tenant isolation violations by kind");

    gauge!(
        METRIC_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    if let Some(start) = START_TIME.get() {
        gauge!(METRIC_UPTIME).set(start.elapsed().as_secs_f64());
    }

    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a handled HTTP request.
pub fn record_request(route: &str, status: u16, duration: Duration) {
    counter!(
        METRIC_REQUESTS,
        "route" => route.to_owned(),
        "status" => status.to_string(),
    )
    .increment(1);

    histogram!(METRIC_REQUEST_DURATION, "route" => route.to_owned())
        .record(duration.as_secs_f64());
}

/// Record the outcome of a read-through lookup.
///
/// Outcomes: `hit`, `miss`, `coalesced`, `compute_failure`.
pub fn record_cache_lookup(outcome: &'static str) {
    let name = match outcome {
        "hit" => METRIC_CACHE_HITS,
        "miss" => METRIC_CACHE_MISSES,
        "coalesced" => METRIC_CACHE_COALESCED,
        _ => METRIC_CACHE_COMPUTE_FAILURES,
    };
    counter!(name).increment(1);
}

/// Record one tag invalidation and the number of entries it removed.
pub fn record_cache_invalidation(removed: u64) {
    counter!(METRIC_CACHE_INVALIDATIONS).increment(1);
    counter!(METRIC_CACHE_INVALIDATED_ENTRIES).increment(removed);
}

/// Update cache size gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_cache_size(entries: u64) {
    gauge!(METRIC_CACHE_SIZE).set(entries as f64);
}

/// Record an isolation violation.
pub fn record_violation(kind: &str) {
    counter!(METRIC_VIOLATIONS, "kind" => kind.to_owned()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_metrics_without_init() {
        let output = render_metrics();
        assert!(output.is_empty());
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_cache_lookup("hit");
        record_cache_lookup("coalesced");
        record_cache_invalidation(3);
        record_violation("cross_tenant_write");
        record_request("/tasks", 200, Duration::from_millis(4));
        set_cache_size(12);
    }
}
