//! In-memory repository implementations
//!
//! Used by tests and by the `memory` runtime when PostgreSQL is not
//! available.

use crate::domain::call::{CallRequest, CallRequestRepository, CallStatus};
use crate::domain::campaign::{Campaign, CampaignRepository, CampaignStatus};
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryCampaignRepository {
    campaigns: Mutex<HashMap<Uuid, Campaign>>,
}

impl InMemoryCampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn save(&self, campaign: &Campaign) -> Result<()> {
        self.campaigns
            .lock()
            .unwrap()
            .insert(campaign.id, campaign.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Campaign>> {
        Ok(self.campaigns.lock().unwrap().get(&id).cloned())
    }

    async fn find_schedulable(&self) -> Result<Vec<Campaign>> {
        self.find_by_statuses(&[CampaignStatus::InProgress, CampaignStatus::Pending])
            .await
    }

    async fn find_by_statuses(&self, statuses: &[CampaignStatus]) -> Result<Vec<Campaign>> {
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|c| statuses.contains(&c.status))
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(campaigns)
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Campaign>> {
        let mut campaigns: Vec<Campaign> =
            self.campaigns.lock().unwrap().values().cloned().collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.campaigns.lock().unwrap().len() as i64)
    }

    async fn count_by_status(&self, status: CampaignStatus) -> Result<i64> {
        Ok(self
            .campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == status)
            .count() as i64)
    }

    async fn sum_concurrency_limit_in_progress(&self) -> Result<i64> {
        Ok(self
            .campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == CampaignStatus::InProgress)
            .map(|c| c.concurrency_limit as i64)
            .sum())
    }
}

#[derive(Default)]
pub struct InMemoryCallRequestRepository {
    calls: Mutex<HashMap<Uuid, CallRequest>>,
}

impl InMemoryCallRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallRequestRepository for InMemoryCallRequestRepository {
    async fn save(&self, call: &CallRequest) -> Result<()> {
        self.calls.lock().unwrap().insert(call.id, call.clone());
        Ok(())
    }

    async fn save_all(&self, calls: &[CallRequest]) -> Result<()> {
        let mut map = self.calls.lock().unwrap();
        for call in calls {
            map.insert(call.id, call.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CallRequest>> {
        Ok(self.calls.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_external_call_id(
        &self,
        external_call_id: &str,
    ) -> Result<Option<CallRequest>> {
        Ok(self
            .calls
            .lock()
            .unwrap()
            .values()
            .find(|c| c.external_call_id.as_deref() == Some(external_call_id))
            .cloned())
    }

    async fn find_retryable(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CallRequest>> {
        let mut calls: Vec<CallRequest> = self
            .calls
            .lock()
            .unwrap()
            .values()
            .filter(|c| {
                c.campaign_id == campaign_id
                    && c.status == CallStatus::Failed
                    && c.next_retry_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        calls.sort_by(|a, b| {
            b.retry_count
                .cmp(&a.retry_count)
                .then(a.created_at.cmp(&b.created_at))
        });
        calls.truncate(limit);
        Ok(calls)
    }

    async fn find_pending(&self, campaign_id: Uuid, limit: usize) -> Result<Vec<CallRequest>> {
        let mut calls: Vec<CallRequest> = self
            .calls
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.campaign_id == campaign_id && c.status == CallStatus::Pending)
            .cloned()
            .collect();
        calls.sort_by_key(|c| c.created_at);
        calls.truncate(limit);
        Ok(calls)
    }

    async fn find_timed_out(&self, now: DateTime<Utc>) -> Result<Vec<CallRequest>> {
        Ok(self
            .calls
            .lock()
            .unwrap()
            .values()
            .filter(|c| {
                c.status == CallStatus::InProgress
                    && c.expected_callback_by.is_some_and(|at| at < now)
            })
            .cloned()
            .collect())
    }

    async fn count_by_campaign_and_status(
        &self,
        campaign_id: Uuid,
        status: CallStatus,
    ) -> Result<i64> {
        Ok(self
            .calls
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.campaign_id == campaign_id && c.status == status)
            .count() as i64)
    }

    async fn status_counts(&self, campaign_id: Uuid) -> Result<HashMap<CallStatus, i64>> {
        let mut counts = HashMap::new();
        for call in self.calls.lock().unwrap().values() {
            if call.campaign_id == campaign_id {
                *counts.entry(call.status).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn count_by_status(&self, status: CallStatus) -> Result<i64> {
        Ok(self
            .calls
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status == status)
            .count() as i64)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.calls.lock().unwrap().len() as i64)
    }

    async fn bulk_update_status(
        &self,
        campaign_id: Uuid,
        from: &[CallStatus],
        to: CallStatus,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut updated = 0;
        for call in self.calls.lock().unwrap().values_mut() {
            if call.campaign_id == campaign_id && from.contains(&call.status) {
                call.status = to;
                call.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn list_by_campaign(
        &self,
        campaign_id: Uuid,
        status: Option<CallStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CallRequest>> {
        let mut calls: Vec<CallRequest> = self
            .calls
            .lock()
            .unwrap()
            .values()
            .filter(|c| {
                c.campaign_id == campaign_id && status.map(|s| c.status == s).unwrap_or(true)
            })
            .cloned()
            .collect();
        calls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(calls
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn exists_by_campaign_and_phone(
        &self,
        campaign_id: Uuid,
        phone_number: &str,
    ) -> Result<bool> {
        Ok(self
            .calls
            .lock()
            .unwrap()
            .values()
            .any(|c| c.campaign_id == campaign_id && c.phone_number == phone_number))
    }

    async fn sum_retry_count(&self) -> Result<i64> {
        Ok(self
            .calls
            .lock()
            .unwrap()
            .values()
            .map(|c| c.retry_count as i64)
            .sum())
    }

    async fn avg_call_duration(&self) -> Result<Option<f64>> {
        let calls = self.calls.lock().unwrap();
        let durations: Vec<i32> = calls
            .values()
            .filter_map(|c| c.call_duration_seconds)
            .collect();
        if durations.is_empty() {
            return Ok(None);
        }
        let sum: i64 = durations.iter().map(|d| *d as i64).sum();
        Ok(Some(sum as f64 / durations.len() as f64))
    }
}
