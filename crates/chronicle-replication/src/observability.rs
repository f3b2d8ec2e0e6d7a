//! Replication metrics
//!
//! Lightweight, Rust-native metrics using the `metrics` crate with
//! Prometheus export support. Every recording function compiles to a no-op
//! when the `metrics-prometheus` feature is disabled.

/// Stream receiver metrics
pub struct ReplicationMetrics;

#[cfg_attr(not(feature = "metrics-prometheus"), allow(unused_variables))]
impl ReplicationMetrics {
    // ---- Counters ----

    /// Raw stream sessions opened (first open and every reconnect)
    pub fn increment_streams_opened() {
        #[cfg(feature = "metrics-prometheus")]
        metrics::counter!("chronicle_replication_streams_opened_total").increment(1);
    }

    /// Stream replacements performed by the recv loop
    pub fn increment_reconnects() {
        #[cfg(feature = "metrics-prometheus")]
        metrics::counter!("chronicle_replication_reconnects_total").increment(1);
    }

    /// Outbound frames sent
    pub fn increment_messages_sent() {
        #[cfg(feature = "metrics-prometheus")]
        metrics::counter!("chronicle_replication_messages_sent_total").increment(1);
    }

    /// Inbound frames received
    pub fn increment_messages_received() {
        #[cfg(feature = "metrics-prometheus")]
        metrics::counter!("chronicle_replication_messages_received_total").increment(1);
    }

    /// Sync-state acks reported back to the source
    pub fn increment_acks_sent() {
        #[cfg(feature = "metrics-prometheus")]
        metrics::counter!("chronicle_replication_acks_sent_total").increment(1);
    }

    /// Failed outbound sends (swallowed by the ack loop)
    pub fn increment_send_errors() {
        #[cfg(feature = "metrics-prometheus")]
        metrics::counter!("chronicle_replication_send_errors_total").increment(1);
    }

    /// Inbound stream failures observed by the recv loop
    pub fn increment_recv_errors() {
        #[cfg(feature = "metrics-prometheus")]
        metrics::counter!("chronicle_replication_recv_errors_total").increment(1);
    }

    /// Tasks handed to the tracker
    pub fn record_tasks_tracked(count: usize) {
        #[cfg(feature = "metrics-prometheus")]
        metrics::counter!("chronicle_replication_tasks_tracked_total").increment(count as u64);
    }

    // ---- Gauges ----

    /// Last low watermark acked for a shard-pair's clusters
    pub fn set_low_watermark(source_cluster: &str, target_cluster: &str, watermark: i64) {
        #[cfg(feature = "metrics-prometheus")]
        metrics::gauge!(
            "chronicle_replication_low_watermark",
            "source_cluster" => source_cluster.to_string(),
            "target_cluster" => target_cluster.to_string()
        )
        .set(watermark as f64);
    }
}

// ============================================================================
// Prometheus Backend (when enabled)
// ============================================================================

#[cfg(feature = "metrics-prometheus")]
mod prom {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    /// Start a HTTP server on `addr` that serves `/metrics`
    pub fn init_prometheus_exporter(
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        PrometheusBuilder::new().with_http_listener(addr).install()?;

        tracing::info!(
            "Prometheus metrics exporter listening on http://{}/metrics",
            addr
        );
        Ok(())
    }

    /// Install the recorder without a server (for embedding in an existing one)
    pub fn init_prometheus_recorder(
    ) -> Result<metrics_exporter_prometheus::PrometheusHandle, Box<dyn std::error::Error + Send + Sync>>
    {
        let handle = PrometheusBuilder::new().install_recorder()?;
        Ok(handle)
    }
}

#[cfg(feature = "metrics-prometheus")]
pub use prom::{init_prometheus_exporter, init_prometheus_recorder};
