//! PostgreSQL repository implementations

use crate::domain::call::{CallRequest, CallRequestRepository, CallStatus};
use crate::domain::campaign::{
    BusinessHours, Campaign, CampaignRepository, CampaignStatus, RetryConfig,
};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

fn db_err(e: sqlx::Error) -> DomainError {
    error!("Database error: {}", e);
    DomainError::Infrastructure(format!("Database error: {}", e))
}

#[derive(FromRow)]
struct CampaignRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
    concurrency_limit: i32,
    priority: i32,
    max_retries: i32,
    sync_initial_backoff_ms: i64,
    sync_backoff_multiplier: f64,
    callback_retry_delay_ms: i64,
    callback_timeout_ms: i64,
    business_start_time: NaiveTime,
    business_end_time: NaiveTime,
    business_timezone: String,
    business_allowed_days: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CampaignRow> for Campaign {
    fn from(r: CampaignRow) -> Self {
        Campaign {
            id: r.id,
            name: r.name,
            description: r.description,
            status: CampaignStatus::from_str(&r.status).unwrap_or(CampaignStatus::Failed),
            concurrency_limit: r.concurrency_limit,
            priority: r.priority,
            retry_config: RetryConfig {
                max_retries: r.max_retries.max(0) as u32,
                sync_initial_backoff_ms: r.sync_initial_backoff_ms.max(0) as u64,
                sync_backoff_multiplier: r.sync_backoff_multiplier,
                callback_retry_delay_ms: r.callback_retry_delay_ms.max(0) as u64,
                callback_timeout_ms: r.callback_timeout_ms.max(0) as u64,
            },
            business_hours: BusinessHours {
                start_time: r.business_start_time,
                end_time: r.business_end_time,
                timezone: r.business_timezone,
                allowed_days: r.business_allowed_days,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const CAMPAIGN_COLUMNS: &str = "id, name, description, status, concurrency_limit, priority, \
     max_retries, sync_initial_backoff_ms, sync_backoff_multiplier, \
     callback_retry_delay_ms, callback_timeout_ms, \
     business_start_time, business_end_time, business_timezone, business_allowed_days, \
     created_at, updated_at";

pub struct PgCampaignRepository {
    pool: PgPool,
}

impl PgCampaignRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    async fn save(&self, campaign: &Campaign) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, name, description, status, concurrency_limit, priority,
                max_retries, sync_initial_backoff_ms, sync_backoff_multiplier,
                callback_retry_delay_ms, callback_timeout_ms,
                business_start_time, business_end_time, business_timezone, business_allowed_days,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                status = EXCLUDED.status,
                concurrency_limit = EXCLUDED.concurrency_limit,
                priority = EXCLUDED.priority,
                max_retries = EXCLUDED.max_retries,
                sync_initial_backoff_ms = EXCLUDED.sync_initial_backoff_ms,
                sync_backoff_multiplier = EXCLUDED.sync_backoff_multiplier,
                callback_retry_delay_ms = EXCLUDED.callback_retry_delay_ms,
                callback_timeout_ms = EXCLUDED.callback_timeout_ms,
                business_start_time = EXCLUDED.business_start_time,
                business_end_time = EXCLUDED.business_end_time,
                business_timezone = EXCLUDED.business_timezone,
                business_allowed_days = EXCLUDED.business_allowed_days,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(campaign.id)
        .bind(&campaign.name)
        .bind(&campaign.description)
        .bind(campaign.status.as_str())
        .bind(campaign.concurrency_limit)
        .bind(campaign.priority)
        .bind(campaign.retry_config.max_retries as i32)
        .bind(campaign.retry_config.sync_initial_backoff_ms as i64)
        .bind(campaign.retry_config.sync_backoff_multiplier)
        .bind(campaign.retry_config.callback_retry_delay_ms as i64)
        .bind(campaign.retry_config.callback_timeout_ms as i64)
        .bind(campaign.business_hours.start_time)
        .bind(campaign.business_hours.end_time)
        .bind(&campaign.business_hours.timezone)
        .bind(&campaign.business_hours.allowed_days)
        .bind(campaign.created_at)
        .bind(campaign.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Campaign>> {
        let row: Option<CampaignRow> = sqlx::query_as(&format!(
            "SELECT {} FROM campaigns WHERE id = $1",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_schedulable(&self) -> Result<Vec<Campaign>> {
        self.find_by_statuses(&[CampaignStatus::InProgress, CampaignStatus::Pending])
            .await
    }

    async fn find_by_statuses(&self, statuses: &[CampaignStatus]) -> Result<Vec<Campaign>> {
        let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows: Vec<CampaignRow> = sqlx::query_as(&format!(
            "SELECT {} FROM campaigns WHERE status = ANY($1) \
             ORDER BY priority DESC, created_at ASC",
            CAMPAIGN_COLUMNS
        ))
        .bind(&names)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Campaign>> {
        let rows: Vec<CampaignRow> = sqlx::query_as(&format!(
            "SELECT {} FROM campaigns ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            CAMPAIGN_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM campaigns")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn count_by_status(&self, status: CampaignStatus) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM campaigns WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn sum_concurrency_limit_in_progress(&self) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(concurrency_limit), 0)::BIGINT FROM campaigns \
             WHERE status = 'IN_PROGRESS'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[derive(FromRow)]
struct CallRow {
    id: Uuid,
    campaign_id: Uuid,
    phone_number: String,
    status: String,
    retry_count: i32,
    last_attempted_at: Option<DateTime<Utc>>,
    next_retry_at: Option<DateTime<Utc>>,
    expected_callback_by: Option<DateTime<Utc>>,
    external_call_id: Option<String>,
    failure_reason: Option<String>,
    call_duration_seconds: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CallRow> for CallRequest {
    fn from(r: CallRow) -> Self {
        CallRequest {
            id: r.id,
            campaign_id: r.campaign_id,
            phone_number: r.phone_number,
            status: CallStatus::from_str(&r.status).unwrap_or(CallStatus::Failed),
            retry_count: r.retry_count.max(0) as u32,
            last_attempted_at: r.last_attempted_at,
            next_retry_at: r.next_retry_at,
            expected_callback_by: r.expected_callback_by,
            external_call_id: r.external_call_id,
            failure_reason: r.failure_reason,
            call_duration_seconds: r.call_duration_seconds,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const CALL_COLUMNS: &str = "id, campaign_id, phone_number, status, retry_count, \
     last_attempted_at, next_retry_at, expected_callback_by, external_call_id, \
     failure_reason, call_duration_seconds, created_at, updated_at";

const CALL_UPSERT: &str = r#"
    INSERT INTO call_requests (
        id, campaign_id, phone_number, status, retry_count,
        last_attempted_at, next_retry_at, expected_callback_by, external_call_id,
        failure_reason, call_duration_seconds, created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
    ON CONFLICT (id) DO UPDATE SET
        status = EXCLUDED.status,
        retry_count = EXCLUDED.retry_count,
        last_attempted_at = EXCLUDED.last_attempted_at,
        next_retry_at = EXCLUDED.next_retry_at,
        expected_callback_by = EXCLUDED.expected_callback_by,
        external_call_id = EXCLUDED.external_call_id,
        failure_reason = EXCLUDED.failure_reason,
        call_duration_seconds = EXCLUDED.call_duration_seconds,
        updated_at = EXCLUDED.updated_at
"#;

pub struct PgCallRequestRepository {
    pool: PgPool,
}

impl PgCallRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_call<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    call: &'q CallRequest,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(call.id)
        .bind(call.campaign_id)
        .bind(&call.phone_number)
        .bind(call.status.as_str())
        .bind(call.retry_count as i32)
        .bind(call.last_attempted_at)
        .bind(call.next_retry_at)
        .bind(call.expected_callback_by)
        .bind(&call.external_call_id)
        .bind(&call.failure_reason)
        .bind(call.call_duration_seconds)
        .bind(call.created_at)
        .bind(call.updated_at)
}

#[async_trait]
impl CallRequestRepository for PgCallRequestRepository {
    async fn save(&self, call: &CallRequest) -> Result<()> {
        bind_call(sqlx::query(CALL_UPSERT), call)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn save_all(&self, calls: &[CallRequest]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for call in calls {
            bind_call(sqlx::query(CALL_UPSERT), call)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CallRequest>> {
        let row: Option<CallRow> = sqlx::query_as(&format!(
            "SELECT {} FROM call_requests WHERE id = $1",
            CALL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_external_call_id(
        &self,
        external_call_id: &str,
    ) -> Result<Option<CallRequest>> {
        let row: Option<CallRow> = sqlx::query_as(&format!(
            "SELECT {} FROM call_requests WHERE external_call_id = $1",
            CALL_COLUMNS
        ))
        .bind(external_call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_retryable(
        &self,
        campaign_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CallRequest>> {
        let rows: Vec<CallRow> = sqlx::query_as(&format!(
            "SELECT {} FROM call_requests \
             WHERE campaign_id = $1 AND status = 'FAILED' AND next_retry_at <= $2 \
             ORDER BY retry_count DESC, created_at ASC LIMIT $3",
            CALL_COLUMNS
        ))
        .bind(campaign_id)
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_pending(&self, campaign_id: Uuid, limit: usize) -> Result<Vec<CallRequest>> {
        let rows: Vec<CallRow> = sqlx::query_as(&format!(
            "SELECT {} FROM call_requests \
             WHERE campaign_id = $1 AND status = 'PENDING' \
             ORDER BY created_at ASC LIMIT $2",
            CALL_COLUMNS
        ))
        .bind(campaign_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_timed_out(&self, now: DateTime<Utc>) -> Result<Vec<CallRequest>> {
        let rows: Vec<CallRow> = sqlx::query_as(&format!(
            "SELECT {} FROM call_requests \
             WHERE status = 'IN_PROGRESS' AND expected_callback_by < $1",
            CALL_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count_by_campaign_and_status(
        &self,
        campaign_id: Uuid,
        status: CallStatus,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM call_requests WHERE campaign_id = $1 AND status = $2",
        )
        .bind(campaign_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn status_counts(&self, campaign_id: Uuid) -> Result<HashMap<CallStatus, i64>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM call_requests \
             WHERE campaign_id = $1 GROUP BY status",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut counts = HashMap::new();
        for row in rows {
            let status: String = row.try_get("status").map_err(db_err)?;
            let count: i64 = row.try_get("count").map_err(db_err)?;
            if let Some(status) = CallStatus::from_str(&status) {
                counts.insert(status, count);
            }
        }
        Ok(counts)
    }

    async fn count_by_status(&self, status: CallStatus) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM call_requests WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM call_requests")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn bulk_update_status(
        &self,
        campaign_id: Uuid,
        from: &[CallStatus],
        to: CallStatus,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let from_names: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
        let result = sqlx::query(
            "UPDATE call_requests SET status = $1, updated_at = $2 \
             WHERE campaign_id = $3 AND status = ANY($4)",
        )
        .bind(to.as_str())
        .bind(now)
        .bind(campaign_id)
        .bind(&from_names)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn list_by_campaign(
        &self,
        campaign_id: Uuid,
        status: Option<CallStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CallRequest>> {
        let rows: Vec<CallRow> = match status {
            Some(status) => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM call_requests WHERE campaign_id = $1 AND status = $2 \
                     ORDER BY created_at DESC LIMIT $3 OFFSET $4",
                    CALL_COLUMNS
                ))
                .bind(campaign_id)
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM call_requests WHERE campaign_id = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                    CALL_COLUMNS
                ))
                .bind(campaign_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn exists_by_campaign_and_phone(
        &self,
        campaign_id: Uuid,
        phone_number: &str,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM call_requests WHERE campaign_id = $1 AND phone_number = $2",
        )
        .bind(campaign_id)
        .bind(phone_number)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn sum_retry_count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COALESCE(SUM(retry_count), 0)::BIGINT FROM call_requests")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn avg_call_duration(&self) -> Result<Option<f64>> {
        sqlx::query_scalar(
            "SELECT AVG(call_duration_seconds)::FLOAT8 FROM call_requests \
             WHERE call_duration_seconds IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}
