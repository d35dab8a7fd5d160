//! Callback watchdog
//!
//! Providers occasionally never deliver a callback; without intervention the
//! call would hold its active slot forever. The watchdog periodically sweeps
//! in-progress calls past their callback deadline and settles each one by
//! synthesizing a failure callback, which reuses the normal retry and slot
//! release paths.

use crate::application::call_lifecycle::CallLifecycleService;
use crate::domain::call::{CallRequestRepository, CallbackEvent, CallbackOutcome};
use crate::domain::shared::result::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const TIMEOUT_REASON: &str = "Callback timeout - no response from telephony provider";

pub struct CallbackWatchdog {
    calls: Arc<dyn CallRequestRepository>,
    lifecycle: Arc<CallLifecycleService>,
    interval_ms: u64,
}

impl CallbackWatchdog {
    pub fn new(
        calls: Arc<dyn CallRequestRepository>,
        lifecycle: Arc<CallLifecycleService>,
        interval_ms: u64,
    ) -> Self {
        Self {
            calls,
            lifecycle,
            interval_ms,
        }
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("Callback watchdog started (every {}ms)", self.interval_ms);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep().await {
                error!("Watchdog sweep failed: {}", e);
            }
        }
    }

    /// Settles every timed-out call. Failures on one call do not stop the
    /// sweep.
    pub async fn sweep(&self) -> Result<usize> {
        let timed_out = self.calls.find_timed_out(Utc::now()).await?;
        if timed_out.is_empty() {
            return Ok(0);
        }

        warn!("Found {} call(s) with overdue callbacks", timed_out.len());
        let mut settled = 0;
        for call in timed_out {
            let external_call_id = match call.external_call_id.clone() {
                Some(id) => id,
                None => {
                    warn!("Timed-out call {} has no external id, skipping", call.id);
                    continue;
                }
            };
            let event = CallbackEvent::failed(
                external_call_id,
                CallbackOutcome::Failed,
                TIMEOUT_REASON.to_string(),
            );
            match self.lifecycle.handle_callback(event).await {
                Ok(()) => settled += 1,
                Err(e) => error!("Failed to settle timed-out call {}: {}", call.id, e),
            }
        }
        Ok(settled)
    }
}
