//! Campaign scheduling loop
//!
//! Each cycle takes a batch-sized slot budget, applies queue backpressure,
//! asks the configured distribution policy to split the budget among
//! eligible campaigns, and enqueues call ids for the worker pool. Retryable
//! calls are drained before fresh pending ones so retries are not starved
//! by large imports.

use crate::application::slot_coordinator::SlotCoordinator;
use crate::config::SchedulerConfig;
use crate::domain::call::{CallRequestRepository, CallStatus};
use crate::domain::campaign::{Campaign, CampaignRepository, CampaignStatus};
use crate::domain::coordination::CoordinationStore;
use crate::domain::scheduling::{SchedulingContext, SchedulingPolicy};
use crate::domain::shared::result::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Single shared dispatch queue consumed by the worker pool.
pub const CALL_QUEUE_KEY: &str = "call:queue";

pub struct CallScheduler {
    campaigns: Arc<dyn CampaignRepository>,
    calls: Arc<dyn CallRequestRepository>,
    store: Arc<dyn CoordinationStore>,
    slots: Arc<SlotCoordinator>,
    policy: SchedulingPolicy,
    config: SchedulerConfig,
}

impl CallScheduler {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        calls: Arc<dyn CallRequestRepository>,
        store: Arc<dyn CoordinationStore>,
        slots: Arc<SlotCoordinator>,
        config: SchedulerConfig,
    ) -> Self {
        let policy = SchedulingPolicy::from_name(&config.strategy);
        Self {
            campaigns,
            calls,
            store,
            slots,
            policy,
            config,
        }
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// Fixed-rate loop. Cycle errors are logged and the loop keeps going.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.fixed_rate_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            "Scheduler started: strategy={}, batch_size={}, rate={}ms",
            self.policy.name(),
            self.config.batch_size,
            self.config.fixed_rate_ms
        );
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                error!("Scheduling cycle failed: {}", e);
            }
        }
    }

    /// One scheduling pass. Public so tests and manual triggers can drive
    /// cycles without the timer.
    pub async fn run_cycle(&self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let queue_depth = self.store.queue_len(CALL_QUEUE_KEY).await?;
        let headroom = self.config.max_queue_depth as i64 - queue_depth;
        let slot_budget = (self.config.batch_size as i64).min(headroom);
        if slot_budget <= 0 {
            debug!(
                "Queue depth {} at or above limit {}, skipping cycle",
                queue_depth, self.config.max_queue_depth
            );
            return Ok(());
        }

        let now = Utc::now();
        let eligible: Vec<Campaign> = self
            .campaigns
            .find_schedulable()
            .await?
            .into_iter()
            .filter(|c| c.business_hours.is_open_at(now))
            .collect();
        if eligible.is_empty() {
            return Ok(());
        }

        let context = self.build_context(&eligible).await?;
        let allocations = self
            .policy
            .distribute(&eligible, slot_budget as usize, &context);

        for campaign in &eligible {
            let allocated = allocations.get(&campaign.id).copied().unwrap_or(0);
            if allocated == 0 {
                continue;
            }
            // One broken campaign must not stall the rest of the cycle.
            if let Err(e) = self.enqueue_for_campaign(campaign, allocated).await {
                error!(
                    "Failed to enqueue calls for campaign {}: {}",
                    campaign.id, e
                );
            }
        }
        Ok(())
    }

    async fn build_context(&self, campaigns: &[Campaign]) -> Result<SchedulingContext> {
        let mut remaining = HashMap::new();
        let mut active = HashMap::new();
        let mut queued = HashMap::new();
        for campaign in campaigns {
            let pending = self
                .calls
                .count_by_campaign_and_status(campaign.id, CallStatus::Pending)
                .await?;
            let failed = self
                .calls
                .count_by_campaign_and_status(campaign.id, CallStatus::Failed)
                .await?;
            remaining.insert(campaign.id, pending + failed);
            active.insert(campaign.id, self.slots.active_slots(campaign.id).await?);
            queued.insert(campaign.id, self.slots.queued_count(campaign.id).await?);
        }
        Ok(SchedulingContext::new(remaining, active, queued))
    }

    /// Enqueues up to `allocated` calls, re-clamped against the campaign's
    /// live capacity since counters may have moved after distribution.
    async fn enqueue_for_campaign(&self, campaign: &Campaign, allocated: usize) -> Result<usize> {
        let active = self.slots.active_slots(campaign.id).await?;
        let queued = self.slots.queued_count(campaign.id).await?;
        let capacity = (campaign.concurrency_limit as i64 - active - queued).max(0) as usize;
        let to_enqueue = allocated.min(capacity);
        if to_enqueue == 0 {
            return Ok(0);
        }

        let now = Utc::now();
        let mut batch = self.calls.find_retryable(campaign.id, now, to_enqueue).await?;
        if batch.len() < to_enqueue {
            let fresh = self
                .calls
                .find_pending(campaign.id, to_enqueue - batch.len())
                .await?;
            batch.extend(fresh);
        }
        if batch.is_empty() {
            return Ok(0);
        }

        let mut enqueued = 0;
        for call in &batch {
            self.slots.incr_queued(campaign.id).await?;
            if let Err(e) = self
                .store
                .queue_push(CALL_QUEUE_KEY, &call.id.to_string())
                .await
            {
                // Undo the reservation for the call that never made it in.
                self.slots.decr_queued(campaign.id).await?;
                warn!("Queue push failed for call {}: {}", call.id, e);
                return Err(e);
            }
            enqueued += 1;
        }

        if enqueued > 0 && campaign.status == CampaignStatus::Pending {
            self.activate_campaign(campaign.id).await?;
        }

        debug!(
            "Enqueued {} call(s) for campaign {} (allocated {}, capacity {})",
            enqueued, campaign.id, allocated, capacity
        );
        Ok(enqueued)
    }

    async fn activate_campaign(&self, campaign_id: Uuid) -> Result<()> {
        if let Some(mut campaign) = self.campaigns.find_by_id(campaign_id).await? {
            if campaign.status == CampaignStatus::Pending {
                campaign.status = CampaignStatus::InProgress;
                campaign.touch();
                self.campaigns.save(&campaign).await?;
                info!("Campaign {} moved to IN_PROGRESS", campaign_id);
            }
        }
        Ok(())
    }
}
