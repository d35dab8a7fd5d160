//! Campaign entity and its embedded value objects

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Campaign lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Pending,
    InProgress,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "PAUSED" => Some(Self::Paused),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Retry policy embedded in a campaign.
///
/// Synchronous initiation failures back off exponentially; failures reported
/// through the asynchronous callback use the fixed `callback_retry_delay_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub sync_initial_backoff_ms: u64,
    pub sync_backoff_multiplier: f64,
    pub callback_retry_delay_ms: u64,
    pub callback_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            sync_initial_backoff_ms: 1000,
            sync_backoff_multiplier: 2.0,
            callback_retry_delay_ms: 30_000,
            callback_timeout_ms: 120_000,
        }
    }
}

impl RetryConfig {
    /// Backoff before the given attempt (1-based):
    /// `initial * multiplier^(attempt - 1)`.
    pub fn sync_backoff_ms(&self, attempt: u32) -> u64 {
        let factor = self
            .sync_backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        (self.sync_initial_backoff_ms as f64 * factor) as u64
    }
}

/// Per-campaign calling window.
///
/// Evaluation is fail-open: an unparseable timezone allows calling rather
/// than silently blocking a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    /// Comma-separated weekday names, e.g. "MONDAY,TUESDAY".
    pub allowed_days: String,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            timezone: "UTC".to_string(),
            allowed_days: "MONDAY,TUESDAY,WEDNESDAY,THURSDAY,FRIDAY".to_string(),
        }
    }
}

impl BusinessHours {
    /// A window that is always open.
    pub fn all_day() -> Self {
        Self {
            start_time: NaiveTime::MIN,
            end_time: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            timezone: "UTC".to_string(),
            allowed_days: "MONDAY,TUESDAY,WEDNESDAY,THURSDAY,FRIDAY,SATURDAY,SUNDAY"
                .to_string(),
        }
    }

    pub fn is_open_now(&self) -> bool {
        self.is_open_at(Utc::now())
    }

    pub fn is_open_at(&self, instant: DateTime<Utc>) -> bool {
        // 00:00-23:59 is treated as always open regardless of weekdays
        if self.start_time == NaiveTime::MIN
            && self.end_time == NaiveTime::from_hms_opt(23, 59, 0).unwrap()
        {
            return true;
        }

        let tz: Tz = match self.timezone.parse() {
            Ok(tz) => tz,
            // fail-open on an unparseable timezone
            Err(_) => return true,
        };

        let local = instant.with_timezone(&tz);
        let current_time = local.time();

        if !self.allowed_weekdays().contains(&local.weekday()) {
            return false;
        }

        // Overnight window, e.g. 22:00-06:00
        if self.end_time < self.start_time {
            return current_time >= self.start_time || current_time <= self.end_time;
        }

        current_time >= self.start_time && current_time <= self.end_time
    }

    fn allowed_weekdays(&self) -> HashSet<Weekday> {
        let mut days = HashSet::new();
        for name in self.allowed_days.split(',') {
            if let Some(day) = parse_weekday(name.trim()) {
                days.insert(day);
            }
        }
        if days.is_empty() {
            days.extend([
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]);
        }
        days
    }
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.to_ascii_uppercase().as_str() {
        "MONDAY" => Some(Weekday::Mon),
        "TUESDAY" => Some(Weekday::Tue),
        "WEDNESDAY" => Some(Weekday::Wed),
        "THURSDAY" => Some(Weekday::Thu),
        "FRIDAY" => Some(Weekday::Fri),
        "SATURDAY" => Some(Weekday::Sat),
        "SUNDAY" => Some(Weekday::Sun),
        _ => None,
    }
}

/// A named batch of phone numbers with its own concurrency budget,
/// priority, retry policy and calling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: CampaignStatus,
    pub concurrency_limit: i32,
    pub priority: i32,
    pub retry_config: RetryConfig,
    pub business_hours: BusinessHours,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            status: CampaignStatus::Pending,
            concurrency_limit: 10,
            priority: 5,
            retry_config: RetryConfig::default(),
            business_hours: BusinessHours::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sync_backoff_is_exponential() {
        let config = RetryConfig::default();
        assert_eq!(config.sync_backoff_ms(1), 1000);
        assert_eq!(config.sync_backoff_ms(2), 2000);
        assert_eq!(config.sync_backoff_ms(3), 4000);
        assert_eq!(config.sync_backoff_ms(4), 8000);
    }

    #[test]
    fn all_day_window_is_always_open() {
        let hours = BusinessHours::all_day();
        // 3am on a Sunday
        let instant = Utc.with_ymd_and_hms(2024, 6, 2, 3, 0, 0).unwrap();
        assert!(hours.is_open_at(instant));
    }

    #[test]
    fn closed_outside_window() {
        let hours = BusinessHours::default(); // 09:00-18:00 UTC, Mon-Fri
        let monday_morning = Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap();
        let monday_noon = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let sunday_noon = Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap();
        assert!(!hours.is_open_at(monday_morning));
        assert!(hours.is_open_at(monday_noon));
        assert!(!hours.is_open_at(sunday_noon));
    }

    #[test]
    fn overnight_window_spans_midnight() {
        let hours = BusinessHours {
            start_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            timezone: "UTC".to_string(),
            allowed_days: "MONDAY,TUESDAY,WEDNESDAY,THURSDAY,FRIDAY,SATURDAY,SUNDAY"
                .to_string(),
        };
        let late = Utc.with_ymd_and_hms(2024, 6, 3, 23, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 6, 3, 5, 0, 0).unwrap();
        let midday = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        assert!(hours.is_open_at(late));
        assert!(hours.is_open_at(early));
        assert!(!hours.is_open_at(midday));
    }

    #[test]
    fn invalid_timezone_fails_open() {
        let hours = BusinessHours {
            timezone: "Not/AZone".to_string(),
            ..BusinessHours::default()
        };
        let sunday = Utc.with_ymd_and_hms(2024, 6, 2, 3, 0, 0).unwrap();
        assert!(hours.is_open_at(sunday));
    }

    #[test]
    fn timezone_shifts_the_window() {
        let hours = BusinessHours {
            timezone: "America/New_York".to_string(),
            ..BusinessHours::default()
        };
        // 14:00 UTC on a Monday is 10:00 in New York (EDT): open
        let open = Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap();
        // 10:00 UTC is 06:00 in New York: closed
        let closed = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        assert!(hours.is_open_at(open));
        assert!(!hours.is_open_at(closed));
    }
}
