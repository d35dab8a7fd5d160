//! Call lifecycle orchestration
//!
//! Drives a call request from dispatch through the telephony gateway to its
//! terminal state. The critical invariant is slot accounting: an active slot
//! is claimed before `execute_call` runs and must be released exactly once,
//! either on synchronous failure, on the terminal/retry callback, or by the
//! watchdog synthesizing a timeout callback.

use crate::application::slot_coordinator::{
    SlotCoordinator, METRIC_COMPLETED, METRIC_PERMANENTLY_FAILED, METRIC_RETRIES,
};
use crate::domain::call::{CallRequest, CallStatus, CallbackEvent, CallbackOutcome};
use crate::domain::campaign::{Campaign, CampaignRepository, CampaignStatus};
use crate::domain::call::CallRequestRepository;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::telephony::TelephonyGateway;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct CallLifecycleService {
    campaigns: Arc<dyn CampaignRepository>,
    calls: Arc<dyn CallRequestRepository>,
    gateway: Arc<dyn TelephonyGateway>,
    slots: Arc<SlotCoordinator>,
}

impl CallLifecycleService {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        calls: Arc<dyn CallRequestRepository>,
        gateway: Arc<dyn TelephonyGateway>,
        slots: Arc<SlotCoordinator>,
    ) -> Self {
        Self {
            campaigns,
            calls,
            gateway,
            slots,
        }
    }

    /// Dispatches a call whose active slot has already been claimed.
    ///
    /// On success the external id and callback deadline are persisted
    /// immediately, before any callback could arrive. Any failure path
    /// releases the slot.
    pub async fn execute_call(&self, mut call: CallRequest, campaign: &Campaign) -> Result<()> {
        match self
            .gateway
            .initiate_call(&call.phone_number, call.id)
            .await
        {
            Ok(external_call_id) => {
                let deadline = Utc::now()
                    + ChronoDuration::milliseconds(
                        campaign.retry_config.callback_timeout_ms as i64,
                    );
                call.mark_in_progress(external_call_id.clone(), deadline);
                if let Err(e) = self.calls.save(&call).await {
                    // The provider is dialing but we lost track of the call;
                    // free the slot and let the watchdog-less orphan expire
                    // on the provider side.
                    error!(
                        "Failed to persist in-progress call {} ({}): {}",
                        call.id, external_call_id, e
                    );
                    self.slots.release_slot(call.campaign_id).await?;
                    return Err(e);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Synchronous initiation failure for call {}: {}", call.id, e);
                self.handle_sync_failure(call, campaign, &e).await?;
                Ok(())
            }
        }
    }

    /// Synchronous failures retry with exponential backoff until the
    /// campaign's retry budget is exhausted. The slot is released even when
    /// the durable save fails.
    async fn handle_sync_failure(
        &self,
        mut call: CallRequest,
        campaign: &Campaign,
        cause: &DomainError,
    ) -> Result<()> {
        let retry_config = &campaign.retry_config;
        let metric = if call.retry_count < retry_config.max_retries {
            let attempt = call.retry_count + 1;
            let backoff = retry_config.sync_backoff_ms(attempt);
            let next_retry = Utc::now() + ChronoDuration::milliseconds(backoff as i64);
            call.mark_failed(format!("Sync failure: {}", cause), next_retry);
            info!(
                "Call {} scheduled for retry {} in {}ms",
                call.id, attempt, backoff
            );
            METRIC_RETRIES
        } else {
            call.mark_permanently_failed(format!("Sync failure: {}", cause));
            info!(
                "Call {} permanently failed after {} retries",
                call.id, call.retry_count
            );
            METRIC_PERMANENTLY_FAILED
        };

        let saved = self.calls.save(&call).await;
        let recorded = match &saved {
            Ok(()) => self.slots.incr_metric(call.campaign_id, metric).await,
            Err(_) => Ok(0),
        };
        self.slots.release_slot(call.campaign_id).await?;
        saved?;
        recorded?;

        if call.status == CallStatus::PermanentlyFailed {
            self.check_campaign_completion(call.campaign_id).await?;
        }
        Ok(())
    }

    /// Applies a provider callback (real or synthesized by the watchdog).
    ///
    /// Unknown external ids and calls no longer in progress are ignored with
    /// a warning; the latter guards against double slot release when a late
    /// provider callback races the watchdog.
    pub async fn handle_callback(&self, event: CallbackEvent) -> Result<()> {
        let mut call = match self
            .calls
            .find_by_external_call_id(&event.external_call_id)
            .await?
        {
            Some(call) => call,
            None => {
                warn!(
                    "Callback for unknown external call id {}, ignoring",
                    event.external_call_id
                );
                return Ok(());
            }
        };

        if call.status != CallStatus::InProgress {
            warn!(
                "Callback for call {} in state {:?}, ignoring (already settled)",
                call.id, call.status
            );
            return Ok(());
        }

        let campaign = self
            .campaigns
            .find_by_id(call.campaign_id)
            .await?
            .ok_or_else(|| DomainError::campaign_not_found(call.campaign_id))?;

        let metric = match event.outcome {
            CallbackOutcome::Completed => {
                call.mark_completed(event.duration_seconds);
                METRIC_COMPLETED
            }
            CallbackOutcome::Failed
            | CallbackOutcome::NoAnswer
            | CallbackOutcome::Busy
            | CallbackOutcome::Rejected => {
                let reason = event
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| format!("{:?}", event.outcome));
                let retry_config = &campaign.retry_config;
                if call.retry_count < retry_config.max_retries {
                    let next_retry = Utc::now()
                        + ChronoDuration::milliseconds(retry_config.callback_retry_delay_ms as i64);
                    call.mark_failed(reason, next_retry);
                    METRIC_RETRIES
                } else {
                    call.mark_permanently_failed(reason);
                    METRIC_PERMANENTLY_FAILED
                }
            }
        };

        // Release happens exactly once no matter which branch ran, even if
        // the save or the metric increment failed.
        let saved = self.calls.save(&call).await;
        let recorded = match &saved {
            Ok(()) => self.slots.incr_metric(call.campaign_id, metric).await,
            Err(_) => Ok(0),
        };
        self.slots.release_slot(call.campaign_id).await?;
        saved?;
        recorded?;

        self.check_campaign_completion(call.campaign_id).await?;
        Ok(())
    }

    /// Marks a campaign completed once no call can ever run again.
    async fn check_campaign_completion(&self, campaign_id: Uuid) -> Result<()> {
        let mut campaign = match self.campaigns.find_by_id(campaign_id).await? {
            Some(campaign) if campaign.status == CampaignStatus::InProgress => campaign,
            _ => return Ok(()),
        };

        let counts = self.calls.status_counts(campaign_id).await?;
        let outstanding = [
            CallStatus::Pending,
            CallStatus::Scheduled,
            CallStatus::InProgress,
            CallStatus::Failed,
        ]
        .iter()
        .map(|s| counts.get(s).copied().unwrap_or(0))
        .sum::<i64>();

        if outstanding == 0 {
            campaign.status = CampaignStatus::Completed;
            campaign.touch();
            self.campaigns.save(&campaign).await?;
            info!("Campaign {} completed", campaign_id);
        }
        Ok(())
    }

    /// Creates a throwaway single-call campaign and dials immediately,
    /// bypassing the scheduler. Used for test calls from the API.
    pub async fn trigger_single_call(&self, phone_number: String) -> Result<CallRequest> {
        let mut campaign = Campaign::new(format!("Single Call - {}", phone_number), None);
        campaign.concurrency_limit = 1;
        campaign.status = CampaignStatus::InProgress;
        self.campaigns.save(&campaign).await?;

        let call = CallRequest::new(campaign.id, phone_number);
        self.calls.save(&call).await?;

        if !self
            .slots
            .try_acquire_slot(campaign.id, campaign.concurrency_limit)
            .await?
        {
            return Err(DomainError::Internal(format!(
                "No free slot for ad-hoc call {}",
                call.id
            )));
        }
        self.execute_call(call.clone(), &campaign).await?;

        self.calls
            .find_by_id(call.id)
            .await?
            .ok_or_else(|| DomainError::call_not_found(call.id))
    }
}
