//! API Router configuration

use super::call_handler::{
    get_call, handle_callback, health_check, run_scheduler_cycle, trigger_call,
};
use super::campaign_handler::{
    cancel_campaign, create_campaign, get_campaign, get_campaign_calls, get_campaign_metrics,
    import_numbers, list_campaigns, pause_campaign, start_campaign, AppState,
};
use super::metrics_handler::{global_metrics, metrics_handler};
use crate::application::CallScheduler;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(
    state: AppState,
    prometheus_handle: PrometheusHandle,
    scheduler: Arc<CallScheduler>,
) -> Router {
    // Health check route (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    // Campaign management routes
    let campaign_routes = Router::new()
        .route("/campaigns", post(create_campaign))
        .route("/campaigns", get(list_campaigns))
        .route("/campaigns/:id", get(get_campaign))
        .route("/campaigns/:id/start", post(start_campaign))
        .route("/campaigns/:id/pause", post(pause_campaign))
        .route("/campaigns/:id/cancel", post(cancel_campaign))
        .route("/campaigns/:id/import", post(import_numbers))
        .route("/campaigns/:id/calls", get(get_campaign_calls))
        .route("/campaigns/:id/metrics", get(get_campaign_metrics));

    // Call routes, including the provider callback webhook
    let call_routes = Router::new()
        .route("/calls/trigger", post(trigger_call))
        .route("/calls/:id", get(get_call))
        .route("/callbacks", post(handle_callback));

    // System-wide metrics as JSON
    let monitoring_routes = Router::new().route("/metrics/global", get(global_metrics));

    // Prometheus scrape route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state((prometheus_handle, state.clone()));

    // Operational scheduler trigger (separate state)
    let scheduler_routes = Router::new()
        .route("/scheduler/run", post(run_scheduler_cycle))
        .with_state(scheduler);

    Router::new()
        .merge(health_routes)
        .merge(campaign_routes)
        .merge(call_routes)
        .merge(monitoring_routes)
        .with_state(state)
        .merge(metrics_routes)
        .merge(scheduler_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
