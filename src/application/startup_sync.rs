//! Startup state reconciliation
//!
//! The coordination store survives process restarts independently of the
//! durable store, so its queue and counters can be stale after a crash.
//! Before the scheduler or workers start, the dispatch queue is dropped,
//! queued counters are cleared, and active slot counters are rebuilt from
//! the calls durably marked in progress. Safe to run repeatedly.

use crate::application::scheduler::CALL_QUEUE_KEY;
use crate::application::slot_coordinator::{active_slots_key, SlotCoordinator};
use crate::domain::call::{CallRequestRepository, CallStatus};
use crate::domain::campaign::{CampaignRepository, CampaignStatus};
use crate::domain::coordination::CoordinationStore;
use crate::domain::shared::result::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct StartupSync {
    campaigns: Arc<dyn CampaignRepository>,
    calls: Arc<dyn CallRequestRepository>,
    store: Arc<dyn CoordinationStore>,
    slots: Arc<SlotCoordinator>,
}

impl StartupSync {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        calls: Arc<dyn CallRequestRepository>,
        store: Arc<dyn CoordinationStore>,
        slots: Arc<SlotCoordinator>,
    ) -> Self {
        Self {
            campaigns,
            calls,
            store,
            slots,
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("Reconciling coordination state with durable store");
        self.clear_dispatch_queue().await;
        self.clear_queued_counters().await;
        self.rebuild_active_slots().await?;
        info!("Startup reconciliation complete");
        Ok(())
    }

    /// Queued call ids refer to pre-restart state; the scheduler will
    /// re-enqueue anything still eligible.
    async fn clear_dispatch_queue(&self) {
        match self.store.queue_len(CALL_QUEUE_KEY).await {
            Ok(depth) if depth > 0 => {
                warn!("Dropping {} stale queued call(s)", depth);
            }
            Ok(_) => {}
            Err(e) => error!("Could not read dispatch queue depth: {}", e),
        }
        if let Err(e) = self.store.delete(CALL_QUEUE_KEY).await {
            error!("Could not clear dispatch queue: {}", e);
        }
    }

    async fn clear_queued_counters(&self) {
        let keys = match self.store.keys_with_prefix("campaign:").await {
            Ok(keys) => keys,
            Err(e) => {
                error!("Could not list coordination keys: {}", e);
                return;
            }
        };
        for key in keys.iter().filter(|k| k.ends_with(":queued")) {
            if let Err(e) = self.store.delete(key).await {
                error!("Could not clear queued counter {}: {}", key, e);
            }
        }
    }

    /// Sets each live campaign's active slot counter to its durable
    /// IN_PROGRESS call count, then drops counters for campaigns no longer
    /// live.
    async fn rebuild_active_slots(&self) -> Result<()> {
        let live = self
            .campaigns
            .find_by_statuses(&[
                CampaignStatus::Pending,
                CampaignStatus::InProgress,
                CampaignStatus::Paused,
            ])
            .await?;

        let mut live_keys = HashSet::new();
        for campaign in &live {
            let in_progress = self
                .calls
                .count_by_campaign_and_status(campaign.id, CallStatus::InProgress)
                .await?;
            self.slots.set_active_slots(campaign.id, in_progress).await?;
            live_keys.insert(active_slots_key(campaign.id));
            if in_progress > 0 {
                info!(
                    "Campaign {} restored with {} active call(s)",
                    campaign.id, in_progress
                );
            }
        }

        let keys = self.store.keys_with_prefix("campaign:").await?;
        for key in keys
            .iter()
            .filter(|k| k.ends_with(":active_slots") && !live_keys.contains(*k))
        {
            if let Err(e) = self.store.delete(key).await {
                error!("Could not drop stale slot counter {}: {}", key, e);
            }
        }
        Ok(())
    }
}
