//! Telephony gateway port

use crate::domain::shared::result::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Outbound call initiation. The gateway returns an opaque external call id
/// synchronously; the call outcome arrives later as a [`CallbackEvent`]
/// (`crate::domain::call::CallbackEvent`) correlated by that id.
#[async_trait]
pub trait TelephonyGateway: Send + Sync {
    async fn initiate_call(&self, phone_number: &str, call_request_id: Uuid) -> Result<String>;
}
