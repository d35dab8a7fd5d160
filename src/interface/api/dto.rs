//! API DTOs (Data Transfer Objects)

use crate::application::campaign_service::{ImportOutcome, NewCampaign};
use crate::application::metrics::CampaignMetrics;
use crate::domain::call::{CallRequest, CallStatus, CallbackEvent, CallbackOutcome};
use crate::domain::campaign::{BusinessHours, Campaign, CampaignStatus, RetryConfig};
use crate::domain::shared::error::DomainError;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generic API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Map a domain failure to the HTTP status it should surface as.
pub fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::ValidationError(_) | DomainError::InvalidStateTransition(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Create campaign request
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub description: Option<String>,
    pub concurrency_limit: Option<i32>,
    pub priority: Option<i32>,
    pub retry_config: Option<RetryConfig>,
    pub business_hours: Option<BusinessHours>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
}

impl From<CreateCampaignRequest> for NewCampaign {
    fn from(req: CreateCampaignRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            concurrency_limit: req.concurrency_limit,
            priority: req.priority,
            retry_config: req.retry_config,
            business_hours: req.business_hours,
            phone_numbers: req.phone_numbers,
        }
    }
}

/// Campaign response DTO
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: CampaignStatus,
    pub concurrency_limit: i32,
    pub priority: i32,
    pub retry_config: RetryConfig,
    pub business_hours: BusinessHours,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CampaignMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportOutcome>,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        Self {
            id: campaign.id,
            name: campaign.name,
            description: campaign.description,
            status: campaign.status,
            concurrency_limit: campaign.concurrency_limit,
            priority: campaign.priority,
            retry_config: campaign.retry_config,
            business_hours: campaign.business_hours,
            created_at: campaign.created_at,
            updated_at: campaign.updated_at,
            metrics: None,
            import: None,
        }
    }
}

impl CampaignResponse {
    pub fn with_metrics(mut self, metrics: CampaignMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_import(mut self, import: ImportOutcome) -> Self {
        self.import = Some(import);
        self
    }
}

/// Campaign list response
#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<CampaignResponse>,
    pub limit: i64,
    pub offset: i64,
}

/// Call response DTO
#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub phone_number: String,
    pub status: CallStatus,
    pub retry_count: u32,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub expected_callback_by: Option<DateTime<Utc>>,
    pub external_call_id: Option<String>,
    pub failure_reason: Option<String>,
    pub call_duration_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CallRequest> for CallResponse {
    fn from(call: CallRequest) -> Self {
        Self {
            id: call.id,
            campaign_id: call.campaign_id,
            phone_number: call.phone_number,
            status: call.status,
            retry_count: call.retry_count,
            last_attempted_at: call.last_attempted_at,
            next_retry_at: call.next_retry_at,
            expected_callback_by: call.expected_callback_by,
            external_call_id: call.external_call_id,
            failure_reason: call.failure_reason,
            call_duration_seconds: call.call_duration_seconds,
            created_at: call.created_at,
            updated_at: call.updated_at,
        }
    }
}

/// Call list response
#[derive(Debug, Serialize)]
pub struct CallListResponse {
    pub calls: Vec<CallResponse>,
    pub limit: i64,
    pub offset: i64,
}

/// Phone number import request
#[derive(Debug, Deserialize)]
pub struct ImportNumbersRequest {
    pub phone_numbers: Vec<String>,
}

/// Ad-hoc single call request
#[derive(Debug, Deserialize)]
pub struct TriggerCallRequest {
    pub phone_number: String,
}

/// Provider callback payload
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub external_call_id: String,
    pub outcome: CallbackOutcome,
    pub duration_seconds: Option<i32>,
    pub failure_reason: Option<String>,
}

impl From<CallbackRequest> for CallbackEvent {
    fn from(req: CallbackRequest) -> Self {
        Self {
            external_call_id: req.external_call_id,
            outcome: req.outcome,
            duration_seconds: req.duration_seconds,
            failure_reason: req.failure_reason,
        }
    }
}
