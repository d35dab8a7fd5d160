//! Campaign repository interface

use crate::domain::campaign::entity::{Campaign, CampaignStatus};
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Repository port for campaigns.
///
/// Defined in the domain layer as a trait and implemented by the
/// infrastructure adapters (in-memory, PostgreSQL).
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Insert or update a campaign.
    async fn save(&self, campaign: &Campaign) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Campaign>>;

    /// Campaigns eligible for scheduling: `IN_PROGRESS` or `PENDING`.
    async fn find_schedulable(&self) -> Result<Vec<Campaign>>;

    /// Campaigns in any of the given statuses, ordered by priority
    /// descending then creation time ascending.
    async fn find_by_statuses(&self, statuses: &[CampaignStatus]) -> Result<Vec<Campaign>>;

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Campaign>>;

    async fn count(&self) -> Result<i64>;

    async fn count_by_status(&self, status: CampaignStatus) -> Result<i64>;

    /// Sum of concurrency limits across `IN_PROGRESS` campaigns.
    async fn sum_concurrency_limit_in_progress(&self) -> Result<i64>;
}
