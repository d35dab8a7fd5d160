//! Campaign management
//!
//! CRUD-ish surface for campaigns plus phone number import. Input
//! sanitization and phone normalization happen here, at the boundary, so
//! everything below works with clean values only.

use crate::application::slot_coordinator::SlotCoordinator;
use crate::domain::call::{CallRequest, CallRequestRepository, CallStatus};
use crate::domain::campaign::{
    BusinessHours, Campaign, CampaignRepository, CampaignStatus, RetryConfig,
};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Default)]
pub struct NewCampaign {
    pub name: String,
    pub description: Option<String>,
    pub concurrency_limit: Option<i32>,
    pub priority: Option<i32>,
    pub retry_config: Option<RetryConfig>,
    pub business_hours: Option<BusinessHours>,
    pub phone_numbers: Vec<String>,
}

/// Accounting for a batch of imported phone numbers.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ImportOutcome {
    pub received: usize,
    pub imported: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

pub struct CampaignService {
    campaigns: Arc<dyn CampaignRepository>,
    calls: Arc<dyn CallRequestRepository>,
    slots: Arc<SlotCoordinator>,
}

impl CampaignService {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        calls: Arc<dyn CallRequestRepository>,
        slots: Arc<SlotCoordinator>,
    ) -> Self {
        Self {
            campaigns,
            calls,
            slots,
        }
    }

    pub async fn create_campaign(&self, req: NewCampaign) -> Result<(Campaign, ImportOutcome)> {
        let name = sanitize_text(&req.name);
        if name.is_empty() {
            return Err(DomainError::ValidationError(
                "Campaign name must not be empty".to_string(),
            ));
        }
        if let Some(limit) = req.concurrency_limit {
            if limit < 1 {
                return Err(DomainError::ValidationError(
                    "Concurrency limit must be at least 1".to_string(),
                ));
            }
        }
        if let Some(priority) = req.priority {
            if !(1..=10).contains(&priority) {
                return Err(DomainError::ValidationError(
                    "Priority must be between 1 and 10".to_string(),
                ));
            }
        }

        let description = req
            .description
            .map(|d| sanitize_text(&d))
            .filter(|d| !d.is_empty());
        let mut campaign = Campaign::new(name, description);
        if let Some(limit) = req.concurrency_limit {
            campaign.concurrency_limit = limit;
        }
        if let Some(priority) = req.priority {
            campaign.priority = priority;
        }
        if let Some(retry_config) = req.retry_config {
            campaign.retry_config = retry_config;
        }
        if let Some(business_hours) = req.business_hours {
            campaign.business_hours = business_hours;
        }
        self.campaigns.save(&campaign).await?;

        let outcome = self
            .import_phone_numbers(campaign.id, req.phone_numbers)
            .await?;
        info!(
            "Created campaign {} '{}' with {} call(s)",
            campaign.id, campaign.name, outcome.imported
        );
        Ok((campaign, outcome))
    }

    /// Adds numbers to an existing campaign. Each number is normalized and
    /// deduplicated both within the batch and against calls already stored
    /// for the campaign.
    pub async fn import_phone_numbers(
        &self,
        campaign_id: Uuid,
        numbers: Vec<String>,
    ) -> Result<ImportOutcome> {
        let campaign = self.require_campaign(campaign_id).await?;
        if matches!(
            campaign.status,
            CampaignStatus::Completed | CampaignStatus::Cancelled
        ) {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot import numbers into {} campaign",
                campaign.status.as_str()
            )));
        }

        let mut outcome = ImportOutcome {
            received: numbers.len(),
            ..Default::default()
        };
        let mut seen = HashSet::new();
        let mut batch = Vec::new();
        for raw in &numbers {
            let normalized = match normalize_phone_number(raw) {
                Some(n) => n,
                None => {
                    outcome.invalid += 1;
                    continue;
                }
            };
            if !seen.insert(normalized.clone()) {
                outcome.duplicates += 1;
                continue;
            }
            if self
                .calls
                .exists_by_campaign_and_phone(campaign_id, &normalized)
                .await?
            {
                outcome.duplicates += 1;
                continue;
            }
            batch.push(CallRequest::new(campaign_id, normalized));
        }

        if !batch.is_empty() {
            self.calls.save_all(&batch).await?;
        }
        outcome.imported = batch.len();
        info!(
            "Imported {}/{} number(s) into campaign {} ({} duplicate, {} invalid)",
            outcome.imported, outcome.received, campaign_id, outcome.duplicates, outcome.invalid
        );
        Ok(outcome)
    }

    pub async fn get_campaign(&self, campaign_id: Uuid) -> Result<Campaign> {
        self.require_campaign(campaign_id).await
    }

    pub async fn list_campaigns(&self, offset: i64, limit: i64) -> Result<Vec<Campaign>> {
        self.campaigns
            .list(offset.max(0), limit.clamp(1, MAX_PAGE_SIZE))
            .await
    }

    /// `PENDING` or `PAUSED` -> `IN_PROGRESS`. The active slot counter is
    /// reset so the campaign starts from a clean capacity baseline.
    pub async fn start_campaign(&self, campaign_id: Uuid) -> Result<Campaign> {
        let mut campaign = self.require_campaign(campaign_id).await?;
        match campaign.status {
            CampaignStatus::Pending | CampaignStatus::Paused => {
                campaign.status = CampaignStatus::InProgress;
                campaign.touch();
                self.campaigns.save(&campaign).await?;
                self.slots.reset_active_slots(campaign_id).await?;
                info!("Campaign {} started", campaign_id);
                Ok(campaign)
            }
            other => Err(DomainError::InvalidStateTransition(format!(
                "Cannot start campaign in state {}",
                other.as_str()
            ))),
        }
    }

    /// `IN_PROGRESS` -> `PAUSED`. Calls already dispatched finish normally.
    pub async fn pause_campaign(&self, campaign_id: Uuid) -> Result<Campaign> {
        let mut campaign = self.require_campaign(campaign_id).await?;
        if campaign.status != CampaignStatus::InProgress {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot pause campaign in state {}",
                campaign.status.as_str()
            )));
        }
        campaign.status = CampaignStatus::Paused;
        campaign.touch();
        self.campaigns.save(&campaign).await?;
        info!("Campaign {} paused", campaign_id);
        Ok(campaign)
    }

    /// Terminal cancel. Undispatched calls are cancelled in bulk; in-flight
    /// calls settle through their callbacks.
    pub async fn cancel_campaign(&self, campaign_id: Uuid) -> Result<Campaign> {
        let mut campaign = self.require_campaign(campaign_id).await?;
        if matches!(
            campaign.status,
            CampaignStatus::Completed | CampaignStatus::Cancelled
        ) {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot cancel campaign in state {}",
                campaign.status.as_str()
            )));
        }
        campaign.status = CampaignStatus::Cancelled;
        campaign.touch();
        self.campaigns.save(&campaign).await?;

        let cancelled = self
            .calls
            .bulk_update_status(
                campaign_id,
                &[
                    CallStatus::Pending,
                    CallStatus::Scheduled,
                    CallStatus::Failed,
                ],
                CallStatus::Cancelled,
                Utc::now(),
            )
            .await?;
        info!(
            "Campaign {} cancelled, {} undispatched call(s) cancelled",
            campaign_id, cancelled
        );
        Ok(campaign)
    }

    pub async fn get_campaign_calls(
        &self,
        campaign_id: Uuid,
        status: Option<CallStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CallRequest>> {
        self.require_campaign(campaign_id).await?;
        self.calls
            .list_by_campaign(campaign_id, status, offset.max(0), limit.clamp(1, MAX_PAGE_SIZE))
            .await
    }

    pub async fn get_call(&self, call_id: Uuid) -> Result<CallRequest> {
        self.calls
            .find_by_id(call_id)
            .await?
            .ok_or_else(|| DomainError::call_not_found(call_id))
    }

    async fn require_campaign(&self, campaign_id: Uuid) -> Result<Campaign> {
        self.campaigns
            .find_by_id(campaign_id)
            .await?
            .ok_or_else(|| DomainError::campaign_not_found(campaign_id))
    }
}

/// Strips markup-sensitive characters and collapses runs of whitespace.
fn sanitize_text(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&' | ';'))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a dialable number to `+`-prefixed or bare digits.
///
/// Separators (spaces, dashes, dots, parentheses) are dropped; the result
/// must be 7 to 15 digits, not starting with zero. Returns `None` when the
/// input cannot be a valid number.
fn normalize_phone_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::new();
    for c in rest.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !matches!(c, ' ' | '-' | '.' | '(' | ')') {
            return None;
        }
    }

    if !(7..=15).contains(&digits.len()) {
        return None;
    }
    if digits.starts_with('0') {
        return None;
    }
    Some(format!("{}{}", plus, digits))
}
