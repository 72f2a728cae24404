//! Prometheus Metrics
//!
//! Defines and initializes all Prometheus metrics for the discovery node.
//!
//! Metrics tracked:
//! - `bucketping_publish_total` - counter of descriptor publishes by outcome
//! - `bucketping_discovery_rounds_total` - counter of discovery rounds by outcome
//! - `bucketping_discovery_object_failures_total` - counter of skipped objects by reason
//! - `bucketping_discovery_round_duration_seconds` - histogram of round latency
//! - `bucketping_retract_total` - counter of retracts by outcome
//! - `bucketping_purge_deleted_total` - counter of objects removed by cluster purges
//! - `bucketping_peer_count` - gauge of peers seen in the last round

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;

/// State containing the Prometheus handle for metrics export
#[derive(Clone)]
pub struct MetricsState {
    pub prometheus_handle: PrometheusHandle,
}

/// Initialize the Prometheus recorder.
///
/// With a listen address the exporter also serves `/metrics` over HTTP on
/// its own task; without one the caller renders through the handle.
pub fn init_metrics(
    listen_addr: Option<SocketAddr>,
) -> Result<MetricsState, Box<dyn std::error::Error + Send + Sync>> {
    let handle = match listen_addr {
        Some(addr) => {
            let (recorder, exporter) = PrometheusBuilder::new()
                .with_http_listener(addr)
                .build()?;
            let handle = recorder.handle();
            metrics::set_global_recorder(recorder)
                .map_err(|e| format!("failed to install metrics recorder: {e}"))?;
            tokio::spawn(exporter);
            handle
        }
        None => PrometheusBuilder::new().install_recorder()?,
    };

    register_metric_descriptions();

    Ok(MetricsState {
        prometheus_handle: handle,
    })
}

/// Register descriptions for all metrics
fn register_metric_descriptions() {
    describe_counter!(
        "bucketping_publish_total",
        "Total number of descriptor publishes by outcome"
    );
    describe_counter!(
        "bucketping_discovery_rounds_total",
        "Total number of discovery rounds by outcome"
    );
    describe_counter!(
        "bucketping_discovery_object_failures_total",
        "Descriptor objects skipped during discovery by reason"
    );
    describe_histogram!(
        "bucketping_discovery_round_duration_seconds",
        "Duration of a discovery round in seconds"
    );
    describe_counter!(
        "bucketping_retract_total",
        "Total number of descriptor retracts by outcome"
    );
    describe_counter!(
        "bucketping_purge_deleted_total",
        "Descriptor objects removed by cluster purges"
    );
    describe_gauge!(
        "bucketping_peer_count",
        "Number of peers returned by the last discovery round"
    );
}

/// Record a publish attempt
pub fn record_publish(cluster: &str, outcome: &str) {
    counter!(
        "bucketping_publish_total",
        "cluster" => cluster.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a completed or failed discovery round
pub fn record_discovery_round(cluster: &str, outcome: &str, duration: Duration) {
    counter!(
        "bucketping_discovery_rounds_total",
        "cluster" => cluster.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!(
        "bucketping_discovery_round_duration_seconds",
        "cluster" => cluster.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record an object skipped during discovery
pub fn record_object_failure(cluster: &str, reason: &str) {
    counter!(
        "bucketping_discovery_object_failures_total",
        "cluster" => cluster.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a retract attempt (`removed`, `absent`, `error`)
pub fn record_retract(cluster: &str, outcome: &str) {
    counter!(
        "bucketping_retract_total",
        "cluster" => cluster.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record objects removed by a purge
pub fn record_purge(cluster: &str, deleted: usize) {
    counter!(
        "bucketping_purge_deleted_total",
        "cluster" => cluster.to_string()
    )
    .increment(deleted as u64);
}

/// Update the peer count gauge
pub fn set_peer_count(cluster: &str, count: usize) {
    gauge!("bucketping_peer_count", "cluster" => cluster.to_string()).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_recording() {
        // No recorder installed; these must be no-ops rather than panics
        record_publish("grid", "ok");
        record_discovery_round("grid", "ok", Duration::from_millis(12));
        record_object_failure("grid", "decode");
        record_retract("grid", "removed");
        record_purge("grid", 3);
        set_peer_count("grid", 4);
    }
}
