//! Call API handlers

use super::campaign_handler::AppState;
use super::dto::{
    status_for, ApiResponse, CallResponse, CallbackRequest, TriggerCallRequest,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "outdial",
    }))
}

/// Get a single call
pub async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CallResponse>>) {
    match state.campaign_service.get_call(id).await {
        Ok(call) => (StatusCode::OK, Json(ApiResponse::success(call.into()))),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Trigger an immediate ad-hoc call outside any campaign
pub async fn trigger_call(
    State(state): State<AppState>,
    Json(req): Json<TriggerCallRequest>,
) -> (StatusCode, Json<ApiResponse<CallResponse>>) {
    info!("API: Triggering single call to {}", req.phone_number);
    match state.lifecycle.trigger_single_call(req.phone_number).await {
        Ok(call) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(call.into())),
        ),
        Err(e) => {
            error!("API: Failed to trigger call: {}", e);
            (status_for(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Receive a provider callback
///
/// Always answers 200 for well-formed payloads: unknown or already-settled
/// calls are logged and ignored so providers do not retry forever.
pub async fn handle_callback(
    State(state): State<AppState>,
    Json(req): Json<CallbackRequest>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    info!(
        "API: Callback for external call {} ({:?})",
        req.external_call_id, req.outcome
    );
    match state.lifecycle.handle_callback(req.into()).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))),
        Err(e) => {
            error!("API: Failed to process callback: {}", e);
            (status_for(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Drive one scheduling cycle on demand (operational tooling)
pub async fn run_scheduler_cycle(
    State(scheduler): State<Arc<crate::application::CallScheduler>>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match scheduler.run_cycle().await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))),
        Err(e) => {
            error!("API: Manual scheduling cycle failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
    }
}
