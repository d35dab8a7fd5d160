//! Slot and metric accounting on the shared coordination store
//!
//! All campaign-scoped counters live behind this wrapper so the key layout
//! stays in one place:
//!
//!   campaign:{id}:active_slots     calls currently in flight
//!   campaign:{id}:queued           calls enqueued but not yet picked up
//!   campaign:{id}:metrics:{name}   rolling counters with a TTL
//!
//! Counters are advisory and may drift after a crash; startup sync rebuilds
//! the active slot counters from durable state.

use crate::domain::coordination::CoordinationStore;
use crate::domain::shared::result::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

pub const METRIC_COMPLETED: &str = "completed";
pub const METRIC_PERMANENTLY_FAILED: &str = "permanently_failed";
pub const METRIC_RETRIES: &str = "retries";

pub struct SlotCoordinator {
    store: Arc<dyn CoordinationStore>,
    metric_ttl: Duration,
}

pub fn active_slots_key(campaign_id: Uuid) -> String {
    format!("campaign:{}:active_slots", campaign_id)
}

pub fn queued_key(campaign_id: Uuid) -> String {
    format!("campaign:{}:queued", campaign_id)
}

fn metric_key(campaign_id: Uuid, name: &str) -> String {
    format!("campaign:{}:metrics:{}", campaign_id, name)
}

impl SlotCoordinator {
    pub fn new(store: Arc<dyn CoordinationStore>, metric_ttl: Duration) -> Self {
        Self { store, metric_ttl }
    }

    pub fn store(&self) -> Arc<dyn CoordinationStore> {
        Arc::clone(&self.store)
    }

    pub async fn active_slots(&self, campaign_id: Uuid) -> Result<i64> {
        Ok(self
            .store
            .get(&active_slots_key(campaign_id))
            .await?
            .unwrap_or(0))
    }

    /// Claims one slot if the campaign is under its concurrency limit.
    /// Increments first, then backs off when the limit was overshot, so two
    /// racing claimants can never both land inside the limit unseen.
    pub async fn try_acquire_slot(&self, campaign_id: Uuid, limit: i32) -> Result<bool> {
        let key = active_slots_key(campaign_id);
        let value = self.store.incr(&key).await?;
        if value > limit as i64 {
            self.release_slot(campaign_id).await?;
            return Ok(false);
        }
        Ok(true)
    }

    pub async fn acquire_slot(&self, campaign_id: Uuid) -> Result<i64> {
        self.store.incr(&active_slots_key(campaign_id)).await
    }

    /// Releases one slot, clamping at zero. A negative counter means a
    /// double release happened somewhere; log and repair rather than let the
    /// scheduler see phantom capacity.
    pub async fn release_slot(&self, campaign_id: Uuid) -> Result<()> {
        let key = active_slots_key(campaign_id);
        let value = self.store.decr(&key).await?;
        if value < 0 {
            warn!(
                "Active slot counter for campaign {} went negative ({}), resetting to 0",
                campaign_id, value
            );
            self.store.set(&key, 0).await?;
        }
        Ok(())
    }

    pub async fn reset_active_slots(&self, campaign_id: Uuid) -> Result<()> {
        self.store.set(&active_slots_key(campaign_id), 0).await
    }

    pub async fn set_active_slots(&self, campaign_id: Uuid, value: i64) -> Result<()> {
        self.store.set(&active_slots_key(campaign_id), value).await
    }

    pub async fn queued_count(&self, campaign_id: Uuid) -> Result<i64> {
        Ok(self
            .store
            .get(&queued_key(campaign_id))
            .await?
            .unwrap_or(0))
    }

    pub async fn incr_queued(&self, campaign_id: Uuid) -> Result<i64> {
        self.store.incr(&queued_key(campaign_id)).await
    }

    pub async fn decr_queued(&self, campaign_id: Uuid) -> Result<()> {
        let key = queued_key(campaign_id);
        let value = self.store.decr(&key).await?;
        if value < 0 {
            warn!(
                "Queued counter for campaign {} went negative ({}), resetting to 0",
                campaign_id, value
            );
            self.store.set(&key, 0).await?;
        }
        Ok(())
    }

    pub async fn incr_metric(&self, campaign_id: Uuid, name: &str) -> Result<i64> {
        let key = metric_key(campaign_id, name);
        let value = self.store.incr(&key).await?;
        self.store.expire(&key, self.metric_ttl).await?;
        Ok(value)
    }

    pub async fn get_metric(&self, campaign_id: Uuid, name: &str) -> Result<i64> {
        Ok(self
            .store
            .get(&metric_key(campaign_id, name))
            .await?
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::coordination::InMemoryCoordinationStore;

    fn coordinator() -> SlotCoordinator {
        SlotCoordinator::new(
            Arc::new(InMemoryCoordinationStore::new()),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn try_acquire_enforces_limit() {
        let coord = coordinator();
        let id = Uuid::new_v4();

        assert!(coord.try_acquire_slot(id, 2).await.unwrap());
        assert!(coord.try_acquire_slot(id, 2).await.unwrap());
        assert!(!coord.try_acquire_slot(id, 2).await.unwrap());
        assert_eq!(coord.active_slots(id).await.unwrap(), 2);

        coord.release_slot(id).await.unwrap();
        assert!(coord.try_acquire_slot(id, 2).await.unwrap());
    }

    #[tokio::test]
    async fn release_clamps_at_zero() {
        let coord = coordinator();
        let id = Uuid::new_v4();

        coord.release_slot(id).await.unwrap();
        coord.release_slot(id).await.unwrap();
        assert_eq!(coord.active_slots(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn queued_counter_round_trip() {
        let coord = coordinator();
        let id = Uuid::new_v4();

        coord.incr_queued(id).await.unwrap();
        coord.incr_queued(id).await.unwrap();
        assert_eq!(coord.queued_count(id).await.unwrap(), 2);

        coord.decr_queued(id).await.unwrap();
        coord.decr_queued(id).await.unwrap();
        coord.decr_queued(id).await.unwrap();
        assert_eq!(coord.queued_count(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn metrics_accumulate() {
        let coord = coordinator();
        let id = Uuid::new_v4();

        assert_eq!(coord.get_metric(id, METRIC_COMPLETED).await.unwrap(), 0);
        coord.incr_metric(id, METRIC_COMPLETED).await.unwrap();
        coord.incr_metric(id, METRIC_COMPLETED).await.unwrap();
        assert_eq!(coord.get_metric(id, METRIC_COMPLETED).await.unwrap(), 2);
    }
}
