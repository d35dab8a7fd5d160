//! Mock telephony gateway
//!
//! Generates the asynchronous half of the call lifecycle: initiation
//! returns an external id synchronously, and a delayed task later emits a
//! completion/failure event (or nothing at all, exercising the watchdog).
//! Events are delivered through a channel drained by a dispatcher task, so
//! the gateway never depends on the lifecycle service directly.

use crate::config::TelephonyConfig;
use crate::domain::call::{CallbackEvent, CallbackOutcome};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::telephony::TelephonyGateway;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct MockTelephonyGateway {
    config: TelephonyConfig,
    callbacks: mpsc::UnboundedSender<CallbackEvent>,
}

impl MockTelephonyGateway {
    pub fn new(config: TelephonyConfig, callbacks: mpsc::UnboundedSender<CallbackEvent>) -> Self {
        Self { config, callbacks }
    }

    fn random_failure_outcome() -> CallbackOutcome {
        let outcomes = [
            CallbackOutcome::Failed,
            CallbackOutcome::NoAnswer,
            CallbackOutcome::Busy,
            CallbackOutcome::Rejected,
        ];
        outcomes[rand::thread_rng().gen_range(0..outcomes.len())]
    }
}

#[async_trait]
impl TelephonyGateway for MockTelephonyGateway {
    async fn initiate_call(&self, phone_number: &str, call_request_id: Uuid) -> Result<String> {
        debug!(
            "Initiating mock call to {} for request {}",
            phone_number, call_request_id
        );

        let (sync_failure, callback_delay_ms) = {
            let mut rng = rand::thread_rng();
            let delay = rng
                .gen_range(self.config.mock_min_duration_ms..=self.config.mock_max_duration_ms);
            (
                rng.gen::<f64>() < self.config.mock_sync_failure_rate,
                delay,
            )
        };

        if sync_failure {
            return Err(DomainError::Telephony(
                "Mock sync failure: network timeout".to_string(),
            ));
        }

        let external_call_id = format!("mock-{}", Uuid::new_v4());
        debug!(
            "Mock call initiated: {} -> {}",
            call_request_id, external_call_id
        );

        let sender = self.callbacks.clone();
        let config = self.config.clone();
        let call_id = external_call_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(callback_delay_ms + 1000)).await;

            let roll: f64 = rand::thread_rng().gen();

            // Simulated timeout: no callback at all, the watchdog will act.
            if roll < config.mock_no_callback_rate {
                debug!("Mock call {} - withholding callback", call_id);
                return;
            }

            let event = if roll < config.mock_no_callback_rate + config.mock_callback_failure_rate
            {
                let outcome = Self::random_failure_outcome();
                debug!("Mock call {} failed with {:?}", call_id, outcome);
                CallbackEvent::failed(call_id, outcome, format!("Mock failure: {:?}", outcome))
            } else {
                let duration = 10 + rand::thread_rng().gen_range(0..180);
                debug!("Mock call {} completed after {}s", call_id, duration);
                CallbackEvent::completed(call_id, duration)
            };

            if sender.send(event).is_err() {
                warn!("Callback receiver dropped, discarding mock callback");
            }
        });

        Ok(external_call_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_config() -> TelephonyConfig {
        TelephonyConfig {
            mock_min_duration_ms: 0,
            mock_max_duration_ms: 0,
            mock_callback_failure_rate: 0.0,
            mock_no_callback_rate: 0.0,
            mock_sync_failure_rate: 0.0,
        }
    }

    #[tokio::test]
    async fn returns_external_id_and_delivers_callback() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gateway = MockTelephonyGateway::new(instant_config(), tx);

        let external_id = gateway
            .initiate_call("+15550001111", Uuid::new_v4())
            .await
            .unwrap();
        assert!(external_id.starts_with("mock-"));

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.external_call_id, external_id);
        assert_eq!(event.outcome, CallbackOutcome::Completed);
        assert!(event.duration_seconds.is_some());
    }

    #[tokio::test]
    async fn sync_failure_rate_of_one_always_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = TelephonyConfig {
            mock_sync_failure_rate: 1.0,
            ..instant_config()
        };
        let gateway = MockTelephonyGateway::new(config, tx);

        let result = gateway.initiate_call("+15550001111", Uuid::new_v4()).await;
        assert!(result.is_err());
    }
}
