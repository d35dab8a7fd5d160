//! Campaign and system-wide metric snapshots

use crate::application::slot_coordinator::{SlotCoordinator, METRIC_RETRIES};
use crate::application::worker_pool::CallWorkerPool;
use crate::domain::call::{CallRequestRepository, CallStatus};
use crate::domain::campaign::{CampaignRepository, CampaignStatus};
use crate::domain::shared::result::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Point-in-time view of one campaign's progress.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CampaignMetrics {
    pub total_calls: i64,
    pub pending_calls: i64,
    pub in_progress_calls: i64,
    pub completed_calls: i64,
    pub failed_calls: i64,
    pub permanently_failed_calls: i64,
    pub cancelled_calls: i64,
    pub total_retries: i64,
    pub active_slots: i64,
    pub queued_calls: i64,
}

pub struct CampaignMetricsService {
    calls: Arc<dyn CallRequestRepository>,
    slots: Arc<SlotCoordinator>,
}

impl CampaignMetricsService {
    pub fn new(calls: Arc<dyn CallRequestRepository>, slots: Arc<SlotCoordinator>) -> Self {
        Self { calls, slots }
    }

    pub async fn snapshot(&self, campaign_id: Uuid) -> Result<CampaignMetrics> {
        let counts = self.calls.status_counts(campaign_id).await?;
        let count = |status: CallStatus| counts.get(&status).copied().unwrap_or(0);

        Ok(CampaignMetrics {
            total_calls: counts.values().sum(),
            // Scheduled is a dormant sub-state of pending work.
            pending_calls: count(CallStatus::Pending) + count(CallStatus::Scheduled),
            in_progress_calls: count(CallStatus::InProgress),
            completed_calls: count(CallStatus::Completed),
            failed_calls: count(CallStatus::Failed),
            permanently_failed_calls: count(CallStatus::PermanentlyFailed),
            cancelled_calls: count(CallStatus::Cancelled),
            total_retries: self.slots.get_metric(campaign_id, METRIC_RETRIES).await?,
            active_slots: self.slots.active_slots(campaign_id).await?,
            queued_calls: self.slots.queued_count(campaign_id).await?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GlobalMetrics {
    pub total_campaigns: i64,
    pub active_campaigns: i64,
    pub total_calls: i64,
    pub pending_calls: i64,
    pub in_progress_calls: i64,
    pub completed_calls: i64,
    pub failed_calls: i64,
    pub permanently_failed_calls: i64,
    pub total_retries: i64,
    pub avg_call_duration_seconds: f64,
    pub calls_per_second: f64,
    pub worker_pool_size: usize,
    pub active_workers: usize,
    pub worker_utilization: f64,
    pub queue_depth: i64,
    pub total_concurrency_slots: i64,
    pub active_concurrency_slots: i64,
    pub concurrency_utilization: f64,
}

/// System-wide counters for the operations dashboard.
pub struct GlobalMetricsService {
    campaigns: Arc<dyn CampaignRepository>,
    calls: Arc<dyn CallRequestRepository>,
    slots: Arc<SlotCoordinator>,
    worker_pool: Arc<CallWorkerPool>,
    started_at: Instant,
}

impl GlobalMetricsService {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        calls: Arc<dyn CallRequestRepository>,
        slots: Arc<SlotCoordinator>,
        worker_pool: Arc<CallWorkerPool>,
    ) -> Self {
        Self {
            campaigns,
            calls,
            slots,
            worker_pool,
            started_at: Instant::now(),
        }
    }

    pub async fn snapshot(&self) -> Result<GlobalMetrics> {
        let total_campaigns = self.campaigns.count().await?;
        let active_campaigns = self
            .campaigns
            .count_by_status(CampaignStatus::InProgress)
            .await?;

        let total_calls = self.calls.count().await?;
        let pending_calls = self.calls.count_by_status(CallStatus::Pending).await?
            + self.calls.count_by_status(CallStatus::Scheduled).await?;
        let in_progress_calls = self.calls.count_by_status(CallStatus::InProgress).await?;
        let completed_calls = self.calls.count_by_status(CallStatus::Completed).await?;
        let failed_calls = self.calls.count_by_status(CallStatus::Failed).await?;
        let permanently_failed_calls = self
            .calls
            .count_by_status(CallStatus::PermanentlyFailed)
            .await?;
        let total_retries = self.calls.sum_retry_count().await?;
        let avg_call_duration_seconds = self.calls.avg_call_duration().await?.unwrap_or(0.0);

        let elapsed = self.started_at.elapsed().as_secs_f64().max(1.0);
        let calls_per_second = completed_calls as f64 / elapsed;

        let worker_pool_size = self.worker_pool.pool_size();
        let active_workers = self.worker_pool.active_worker_count();
        let worker_utilization = if worker_pool_size > 0 {
            active_workers as f64 / worker_pool_size as f64
        } else {
            0.0
        };
        let queue_depth = self.worker_pool.queue_depth().await?;

        let total_concurrency_slots = self.campaigns.sum_concurrency_limit_in_progress().await?;
        let mut active_concurrency_slots = 0;
        for campaign in self
            .campaigns
            .find_by_statuses(&[CampaignStatus::InProgress])
            .await?
        {
            active_concurrency_slots += self.slots.active_slots(campaign.id).await?;
        }
        let concurrency_utilization = if total_concurrency_slots > 0 {
            active_concurrency_slots as f64 / total_concurrency_slots as f64
        } else {
            0.0
        };

        Ok(GlobalMetrics {
            total_campaigns,
            active_campaigns,
            total_calls,
            pending_calls,
            in_progress_calls,
            completed_calls,
            failed_calls,
            permanently_failed_calls,
            total_retries,
            avg_call_duration_seconds,
            calls_per_second,
            worker_pool_size,
            active_workers,
            worker_utilization,
            queue_depth,
            total_concurrency_slots,
            active_concurrency_slots,
            concurrency_utilization,
        })
    }
}
