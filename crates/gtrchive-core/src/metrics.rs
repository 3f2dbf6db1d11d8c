//! Prometheus metrics helpers for gtrchive.
//!
//! # Usage
//!
//! ```rust,ignore
//! use gtrchive_core::metrics::{init_metrics, start_metrics_server};
//!
//! let handle = init_metrics()?;
//! start_metrics_server(9090, handle).await?;
//!
//! metrics::counter!("ingest_tweets_total").increment(1);
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component name (`ingest_`, `stream_`)
//! - Suffix: unit or type (`_total`, `_seconds`)
//! - Labels: only low-cardinality values (message kind, reconnect reason)

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Install the Prometheus recorder and register metric descriptions.
///
/// Fails if a recorder is already installed for this process.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_common_metrics();
    Ok(handle)
}

/// Like [`init_metrics`] but returns `None` if a recorder is already installed.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    init_metrics().ok()
}

/// Start the Prometheus metrics HTTP server.
///
/// Binds `0.0.0.0:<port>` before returning, then serves `/metrics` from a
/// background task.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Metrics server stopped: {}", e);
        }
    });

    Ok(())
}

/// Register descriptions for the metrics recorded by the ingestion daemon.
///
/// Called automatically by [`init_metrics`].
fn register_common_metrics() {
    // =========================================================================
    // Ingestion loop
    // =========================================================================

    describe_counter!(
        "ingest_messages_total",
        "Stream messages received by the ingestion loop (label: kind)"
    );
    describe_counter!("ingest_tweets_total", "Content records received");
    describe_counter!(
        "ingest_messages_ignored_total",
        "Non-content stream messages discarded"
    );
    describe_counter!("ingest_inserts_total", "Content records written to the store");
    describe_counter!(
        "ingest_insert_errors_total",
        "Content records lost to a failed insert"
    );
    describe_gauge!(
        "ingestion_running",
        "Whether the ingestion loop is running (1=yes, 0=no)"
    );

    // =========================================================================
    // Stream transport
    // =========================================================================

    describe_counter!(
        "stream_connects_total",
        "Successful connections to the streaming endpoint"
    );
    describe_counter!(
        "stream_reconnects_total",
        "Reconnect attempts to the streaming endpoint (label: reason)"
    );
    describe_counter!(
        "stream_decode_errors_total",
        "Stream lines that were not valid JSON"
    );
    describe_counter!(
        "stream_oversized_lines_total",
        "Stream lines dropped for exceeding the line size limit"
    );
}
