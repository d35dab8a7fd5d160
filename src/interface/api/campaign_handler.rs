//! Campaign API handlers

use super::dto::{
    status_for, ApiResponse, CallListResponse, CallResponse, CampaignListResponse,
    CampaignResponse, CreateCampaignRequest, ImportNumbersRequest,
};
use crate::application::campaign_service::{CampaignService, ImportOutcome};
use crate::application::metrics::{CampaignMetrics, CampaignMetricsService, GlobalMetricsService};
use crate::application::CallLifecycleService;
use crate::domain::call::CallStatus;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub campaign_service: Arc<CampaignService>,
    pub lifecycle: Arc<CallLifecycleService>,
    pub campaign_metrics: Arc<CampaignMetricsService>,
    pub global_metrics: Arc<GlobalMetricsService>,
}

/// Query parameters for paginated listings
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct CampaignCallsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub status: Option<CallStatus>,
}

/// Create a campaign with an optional initial batch of numbers
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(req): Json<CreateCampaignRequest>,
) -> (StatusCode, Json<ApiResponse<CampaignResponse>>) {
    info!("API: Creating campaign '{}'", req.name);

    match state.campaign_service.create_campaign(req.into()).await {
        Ok((campaign, outcome)) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                CampaignResponse::from(campaign).with_import(outcome),
            )),
        ),
        Err(e) => {
            error!("API: Failed to create campaign: {}", e);
            (status_for(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Get a campaign with its live metrics
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CampaignResponse>>) {
    match state.campaign_service.get_campaign(id).await {
        Ok(campaign) => {
            let response = CampaignResponse::from(campaign);
            match state.campaign_metrics.snapshot(id).await {
                Ok(metrics) => (
                    StatusCode::OK,
                    Json(ApiResponse::success(response.with_metrics(metrics))),
                ),
                Err(e) => {
                    error!("API: Failed to read metrics for campaign {}: {}", id, e);
                    (StatusCode::OK, Json(ApiResponse::success(response)))
                }
            }
        }
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// List campaigns
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> (StatusCode, Json<ApiResponse<CampaignListResponse>>) {
    match state
        .campaign_service
        .list_campaigns(query.offset, query.limit)
        .await
    {
        Ok(campaigns) => (
            StatusCode::OK,
            Json(ApiResponse::success(CampaignListResponse {
                campaigns: campaigns.into_iter().map(CampaignResponse::from).collect(),
                limit: query.limit,
                offset: query.offset,
            })),
        ),
        Err(e) => {
            error!("API: Failed to list campaigns: {}", e);
            (status_for(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// Start (or resume) a campaign
pub async fn start_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CampaignResponse>>) {
    info!("API: Starting campaign {}", id);
    match state.campaign_service.start_campaign(id).await {
        Ok(campaign) => (
            StatusCode::OK,
            Json(ApiResponse::success(campaign.into())),
        ),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Pause a running campaign
pub async fn pause_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CampaignResponse>>) {
    info!("API: Pausing campaign {}", id);
    match state.campaign_service.pause_campaign(id).await {
        Ok(campaign) => (
            StatusCode::OK,
            Json(ApiResponse::success(campaign.into())),
        ),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Cancel a campaign
pub async fn cancel_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CampaignResponse>>) {
    info!("API: Cancelling campaign {}", id);
    match state.campaign_service.cancel_campaign(id).await {
        Ok(campaign) => (
            StatusCode::OK,
            Json(ApiResponse::success(campaign.into())),
        ),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Import phone numbers into an existing campaign
pub async fn import_numbers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ImportNumbersRequest>,
) -> (StatusCode, Json<ApiResponse<ImportOutcome>>) {
    info!(
        "API: Importing {} number(s) into campaign {}",
        req.phone_numbers.len(),
        id
    );
    match state
        .campaign_service
        .import_phone_numbers(id, req.phone_numbers)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Live metrics for a single campaign
pub async fn get_campaign_metrics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CampaignMetrics>>) {
    // Resolve the campaign first so unknown ids map to 404.
    if let Err(e) = state.campaign_service.get_campaign(id).await {
        return (status_for(&e), Json(ApiResponse::error(e.to_string())));
    }
    match state.campaign_metrics.snapshot(id).await {
        Ok(metrics) => (StatusCode::OK, Json(ApiResponse::success(metrics))),
        Err(e) => {
            error!("API: Failed to read metrics for campaign {}: {}", id, e);
            (status_for(&e), Json(ApiResponse::error(e.to_string())))
        }
    }
}

/// List a campaign's calls
pub async fn get_campaign_calls(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CampaignCallsQuery>,
) -> (StatusCode, Json<ApiResponse<CallListResponse>>) {
    match state
        .campaign_service
        .get_campaign_calls(id, query.status, query.offset, query.limit)
        .await
    {
        Ok(calls) => (
            StatusCode::OK,
            Json(ApiResponse::success(CallListResponse {
                calls: calls.into_iter().map(CallResponse::from).collect(),
                limit: query.limit,
                offset: query.offset,
            })),
        ),
        Err(e) => (status_for(&e), Json(ApiResponse::error(e.to_string()))),
    }
}
