//! Call request entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Call request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Failed,
    PermanentlyFailed,
    Cancelled,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Scheduled => "SCHEDULED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::PermanentlyFailed => "PERMANENTLY_FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "SCHEDULED" => Some(Self::Scheduled),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "PERMANENTLY_FAILED" => Some(Self::PermanentlyFailed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PermanentlyFailed | Self::Cancelled
        )
    }
}

/// One phone number's dispatch record within a campaign.
///
/// Field invariants:
/// - `external_call_id` is set when the call is dispatched and is the
///   correlation key for the asynchronous callback;
/// - `next_retry_at` is set only while status is `Failed`;
/// - `expected_callback_by` is set only while status is `InProgress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub phone_number: String,
    pub status: CallStatus,
    pub retry_count: u32,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub expected_callback_by: Option<DateTime<Utc>>,
    pub external_call_id: Option<String>,
    pub failure_reason: Option<String>,
    pub call_duration_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallRequest {
    pub fn new(campaign_id: Uuid, phone_number: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            phone_number,
            status: CallStatus::Pending,
            retry_count: 0,
            last_attempted_at: None,
            next_retry_at: None,
            expected_callback_by: None,
            external_call_id: None,
            failure_reason: None,
            call_duration_seconds: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_in_progress(&mut self, external_call_id: String, expected_callback_by: DateTime<Utc>) {
        self.status = CallStatus::InProgress;
        self.external_call_id = Some(external_call_id);
        self.last_attempted_at = Some(Utc::now());
        self.expected_callback_by = Some(expected_callback_by);
        self.next_retry_at = None;
        self.touch();
    }

    pub fn mark_completed(&mut self, duration_seconds: Option<i32>) {
        self.status = CallStatus::Completed;
        self.call_duration_seconds = duration_seconds;
        self.expected_callback_by = None;
        self.touch();
    }

    /// Records a retryable failure. Each failed transition increments
    /// `retry_count` exactly once; the counter is the sole input to both
    /// backoff formulas and the max-retries check.
    pub fn mark_failed(&mut self, reason: String, next_retry_at: DateTime<Utc>) {
        self.status = CallStatus::Failed;
        self.failure_reason = Some(reason);
        self.retry_count += 1;
        self.next_retry_at = Some(next_retry_at);
        self.expected_callback_by = None;
        self.touch();
    }

    pub fn mark_permanently_failed(&mut self, reason: String) {
        self.status = CallStatus::PermanentlyFailed;
        self.failure_reason = Some(reason);
        self.expected_callback_by = None;
        self.next_retry_at = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn failed_transition_increments_retry_count_and_sets_retry_time() {
        let mut call = CallRequest::new(Uuid::new_v4(), "+15550001111".into());
        let retry_at = Utc::now() + Duration::seconds(30);

        call.mark_failed("busy".into(), retry_at);

        assert_eq!(call.status, CallStatus::Failed);
        assert_eq!(call.retry_count, 1);
        assert_eq!(call.next_retry_at, Some(retry_at));
        assert!(call.expected_callback_by.is_none());
    }

    #[test]
    fn in_progress_sets_correlation_key_and_deadline() {
        let mut call = CallRequest::new(Uuid::new_v4(), "+15550001111".into());
        let deadline = Utc::now() + Duration::seconds(120);

        call.mark_in_progress("ext-1".into(), deadline);

        assert_eq!(call.status, CallStatus::InProgress);
        assert_eq!(call.external_call_id.as_deref(), Some("ext-1"));
        assert_eq!(call.expected_callback_by, Some(deadline));
        assert!(call.next_retry_at.is_none());
        assert!(call.last_attempted_at.is_some());
    }

    #[test]
    fn permanent_failure_clears_retry_fields() {
        let mut call = CallRequest::new(Uuid::new_v4(), "+15550001111".into());
        call.mark_failed("no answer".into(), Utc::now());
        call.mark_permanently_failed("retries exhausted".into());

        assert_eq!(call.status, CallStatus::PermanentlyFailed);
        assert!(call.status.is_terminal());
        assert!(call.next_retry_at.is_none());
        assert!(call.expected_callback_by.is_none());
        assert_eq!(call.retry_count, 1);
    }
}
