//! Call request repository interface

use crate::domain::call::entity::{CallRequest, CallStatus};
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
pub trait CallRequestRepository: Send + Sync {
    /// Insert or update a call request.
    async fn save(&self, call: &CallRequest) -> Result<()>;

    /// Batch insert.
    async fn save_all(&self, calls: &[CallRequest]) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CallRequest>>;

    /// Look up a dispatched call by the provider's correlation key.
    async fn find_by_external_call_id(&self, external_call_id: &str)
        -> Result<Option<CallRequest>>;

    /// `FAILED` calls whose `next_retry_at` has passed, ordered by retry
    /// count descending then creation time ascending (calls closest to
    /// exhausting their retries go first).
    async fn find_retryable(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CallRequest>>;

    /// `PENDING` calls ordered oldest first.
    async fn find_pending(&self, campaign_id: Uuid, limit: usize) -> Result<Vec<CallRequest>>;

    /// `IN_PROGRESS` calls whose `expected_callback_by` deadline has passed.
    async fn find_timed_out(&self, now: DateTime<Utc>) -> Result<Vec<CallRequest>>;

    async fn count_by_campaign_and_status(
        &self,
        campaign_id: Uuid,
        status: CallStatus,
    ) -> Result<i64>;

    /// Per-status counts for one campaign.
    async fn status_counts(&self, campaign_id: Uuid) -> Result<HashMap<CallStatus, i64>>;

    async fn count_by_status(&self, status: CallStatus) -> Result<i64>;

    async fn count(&self) -> Result<i64>;

    /// Move every call of the campaign currently in one of `from` to `to`.
    /// Returns the number of rows updated.
    async fn bulk_update_status(
        &self,
        campaign_id: Uuid,
        from: &[CallStatus],
        to: CallStatus,
        now: DateTime<Utc>,
    ) -> Result<u64>;

    /// Calls of one campaign, newest first, optionally filtered by status.
    async fn list_by_campaign(
        &self,
        campaign_id: Uuid,
        status: Option<CallStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CallRequest>>;

    async fn exists_by_campaign_and_phone(
        &self,
        campaign_id: Uuid,
        phone_number: &str,
    ) -> Result<bool>;

    async fn sum_retry_count(&self) -> Result<i64>;

    async fn avg_call_duration(&self) -> Result<Option<f64>>;
}
