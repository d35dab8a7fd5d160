//! Asynchronous call outcome events delivered by the telephony provider

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackOutcome {
    Completed,
    Failed,
    NoAnswer,
    Busy,
    Rejected,
}

/// Outcome payload correlated to a dispatched call by its external id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackEvent {
    pub external_call_id: String,
    pub outcome: CallbackOutcome,
    pub duration_seconds: Option<i32>,
    pub failure_reason: Option<String>,
}

impl CallbackEvent {
    pub fn completed(external_call_id: String, duration_seconds: i32) -> Self {
        Self {
            external_call_id,
            outcome: CallbackOutcome::Completed,
            duration_seconds: Some(duration_seconds),
            failure_reason: None,
        }
    }

    pub fn failed(external_call_id: String, outcome: CallbackOutcome, reason: String) -> Self {
        Self {
            external_call_id,
            outcome,
            duration_seconds: None,
            failure_reason: Some(reason),
        }
    }
}
