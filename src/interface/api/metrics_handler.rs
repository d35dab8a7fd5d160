//! Metrics handlers
//!
//! `/metrics` serves the Prometheus exposition format; `/metrics/global`
//! serves the same numbers as JSON for dashboards.

use super::campaign_handler::AppState;
use super::dto::ApiResponse;
use crate::application::metrics::GlobalMetrics;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::error;

/// Initialize the Prometheus metrics exporter
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    describe_gauge!("outdial_active_campaigns", "Campaigns currently running");
    describe_gauge!("outdial_calls_in_progress", "Calls currently in flight");
    describe_gauge!("outdial_queue_depth", "Calls waiting in the dispatch queue");
    describe_gauge!("outdial_active_workers", "Workers currently executing a call");
    describe_gauge!(
        "outdial_concurrency_utilization",
        "Active slots over total concurrency budget"
    );

    handle
}

/// Refresh the exported gauges from a fresh snapshot.
pub fn record_system_gauges(snapshot: &GlobalMetrics) {
    gauge!("outdial_active_campaigns").set(snapshot.active_campaigns as f64);
    gauge!("outdial_calls_in_progress").set(snapshot.in_progress_calls as f64);
    gauge!("outdial_queue_depth").set(snapshot.queue_depth as f64);
    gauge!("outdial_active_workers").set(snapshot.active_workers as f64);
    gauge!("outdial_concurrency_utilization").set(snapshot.concurrency_utilization);
}

/// Prometheus scrape endpoint
pub async fn metrics_handler(
    State((prometheus_handle, state)): State<(PrometheusHandle, AppState)>,
) -> Response {
    // Gauges are refreshed lazily at scrape time.
    match state.global_metrics.snapshot().await {
        Ok(snapshot) => record_system_gauges(&snapshot),
        Err(e) => error!("Failed to refresh metric gauges: {}", e),
    }
    (StatusCode::OK, prometheus_handle.render()).into_response()
}

/// System-wide metrics as JSON
pub async fn global_metrics(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<GlobalMetrics>>) {
    match state.global_metrics.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json(ApiResponse::success(snapshot))),
        Err(e) => {
            error!("Failed to build system metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}
