//! Call lifecycle integration tests
//!
//! Exercises dispatch, retry scheduling, callback settlement, watchdog
//! timeouts and slot accounting against the in-memory adapters.

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{running_campaign, Harness, MetricIncrFailStore, ScriptedGateway};
use outdial::application::{CallLifecycleService, CallbackWatchdog, SlotCoordinator};
use outdial::domain::call::{
    CallRequest, CallRequestRepository, CallStatus, CallbackEvent, CallbackOutcome,
};
use outdial::domain::campaign::{CampaignRepository, CampaignStatus};
use outdial::domain::coordination::CoordinationStore;
use outdial::domain::telephony::TelephonyGateway;
use outdial::infrastructure::persistence::{
    InMemoryCallRequestRepository, InMemoryCampaignRepository,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn dispatch_persists_external_id_and_callback_deadline() {
    let harness = Harness::new();
    let campaign = running_campaign(1);
    harness.campaigns.save(&campaign).await.unwrap();
    let call = CallRequest::new(campaign.id, "+15550001111".to_string());
    harness.calls.save(&call).await.unwrap();

    harness.slots.acquire_slot(campaign.id).await.unwrap();
    harness
        .lifecycle
        .execute_call(call.clone(), &campaign)
        .await
        .unwrap();

    let stored = harness.calls.find_by_id(call.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CallStatus::InProgress);
    assert_eq!(stored.external_call_id.as_deref(), Some("ext-0"));
    // Deadline derives from the campaign's 120s callback timeout.
    let deadline = stored.expected_callback_by.unwrap();
    assert!(deadline > Utc::now() + ChronoDuration::seconds(100));
    // The slot stays held while the call is in flight.
    assert_eq!(harness.slots.active_slots(campaign.id).await.unwrap(), 1);
}

#[tokio::test]
async fn sync_failure_schedules_retry_with_backoff_and_releases_slot() {
    let harness = Harness::with_gateway(ScriptedGateway::failing());
    let campaign = running_campaign(1);
    harness.campaigns.save(&campaign).await.unwrap();
    let call = CallRequest::new(campaign.id, "+15550001111".to_string());
    harness.calls.save(&call).await.unwrap();

    harness.slots.acquire_slot(campaign.id).await.unwrap();
    harness
        .lifecycle
        .execute_call(call.clone(), &campaign)
        .await
        .unwrap();

    let stored = harness.calls.find_by_id(call.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CallStatus::Failed);
    assert_eq!(stored.retry_count, 1);
    assert!(stored.failure_reason.unwrap().contains("Sync failure"));
    // First attempt backs off by the initial 1000ms.
    let next_retry = stored.next_retry_at.unwrap();
    assert!(next_retry > Utc::now());
    assert!(next_retry < Utc::now() + ChronoDuration::seconds(5));

    assert_eq!(harness.slots.active_slots(campaign.id).await.unwrap(), 0);
    assert_eq!(
        harness.slots.get_metric(campaign.id, "retries").await.unwrap(),
        1
    );
}

#[tokio::test]
async fn sync_failure_past_retry_budget_is_permanent() {
    let harness = Harness::with_gateway(ScriptedGateway::failing());
    let campaign = running_campaign(1);
    harness.campaigns.save(&campaign).await.unwrap();
    let mut call = CallRequest::new(campaign.id, "+15550001111".to_string());
    call.retry_count = 3; // budget (max_retries = 3) already spent
    harness.calls.save(&call).await.unwrap();

    harness.slots.acquire_slot(campaign.id).await.unwrap();
    harness
        .lifecycle
        .execute_call(call.clone(), &campaign)
        .await
        .unwrap();

    let stored = harness.calls.find_by_id(call.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CallStatus::PermanentlyFailed);
    assert_eq!(harness.slots.active_slots(campaign.id).await.unwrap(), 0);
    assert_eq!(
        harness
            .slots
            .get_metric(campaign.id, "permanently_failed")
            .await
            .unwrap(),
        1
    );

    // No call can ever run again, so the campaign completes.
    let stored_campaign = harness
        .campaigns
        .find_by_id(campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_campaign.status, CampaignStatus::Completed);
}

#[tokio::test]
async fn completed_callback_settles_call_and_campaign() {
    let harness = Harness::new();
    let campaign = running_campaign(1);
    harness.campaigns.save(&campaign).await.unwrap();
    let call = CallRequest::new(campaign.id, "+15550001111".to_string());
    harness.calls.save(&call).await.unwrap();

    harness.slots.acquire_slot(campaign.id).await.unwrap();
    harness
        .lifecycle
        .execute_call(call.clone(), &campaign)
        .await
        .unwrap();
    let external_id = harness
        .calls
        .find_by_id(call.id)
        .await
        .unwrap()
        .unwrap()
        .external_call_id
        .unwrap();

    harness
        .lifecycle
        .handle_callback(CallbackEvent::completed(external_id, 42))
        .await
        .unwrap();

    let stored = harness.calls.find_by_id(call.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CallStatus::Completed);
    assert_eq!(stored.call_duration_seconds, Some(42));
    assert_eq!(harness.slots.active_slots(campaign.id).await.unwrap(), 0);
    assert_eq!(
        harness
            .slots
            .get_metric(campaign.id, "completed")
            .await
            .unwrap(),
        1
    );

    let stored_campaign = harness
        .campaigns
        .find_by_id(campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_campaign.status, CampaignStatus::Completed);
}

#[tokio::test]
async fn failure_callback_retries_after_fixed_delay() {
    let harness = Harness::new();
    let campaign = running_campaign(1);
    harness.campaigns.save(&campaign).await.unwrap();
    let call = CallRequest::new(campaign.id, "+15550001111".to_string());
    harness.calls.save(&call).await.unwrap();

    harness.slots.acquire_slot(campaign.id).await.unwrap();
    harness
        .lifecycle
        .execute_call(call.clone(), &campaign)
        .await
        .unwrap();
    let external_id = harness
        .calls
        .find_by_id(call.id)
        .await
        .unwrap()
        .unwrap()
        .external_call_id
        .unwrap();

    harness
        .lifecycle
        .handle_callback(CallbackEvent::failed(
            external_id,
            CallbackOutcome::Busy,
            "Line busy".to_string(),
        ))
        .await
        .unwrap();

    let stored = harness.calls.find_by_id(call.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CallStatus::Failed);
    assert_eq!(stored.retry_count, 1);
    assert_eq!(stored.failure_reason.as_deref(), Some("Line busy"));
    // Callback failures wait the fixed 30s delay, not the sync backoff.
    let next_retry = stored.next_retry_at.unwrap();
    assert!(next_retry > Utc::now() + ChronoDuration::seconds(25));
    assert!(next_retry < Utc::now() + ChronoDuration::seconds(35));

    assert_eq!(harness.slots.active_slots(campaign.id).await.unwrap(), 0);
    // A retryable call remains, so the campaign stays open.
    let stored_campaign = harness
        .campaigns
        .find_by_id(campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_campaign.status, CampaignStatus::InProgress);
}

#[tokio::test]
async fn unknown_external_id_is_ignored() {
    let harness = Harness::new();
    harness
        .lifecycle
        .handle_callback(CallbackEvent::completed("never-dialed".to_string(), 5))
        .await
        .unwrap();
}

#[tokio::test]
async fn late_duplicate_callback_does_not_double_release() {
    let harness = Harness::new();
    let campaign = running_campaign(1);
    harness.campaigns.save(&campaign).await.unwrap();
    let call = CallRequest::new(campaign.id, "+15550001111".to_string());
    harness.calls.save(&call).await.unwrap();

    harness.slots.acquire_slot(campaign.id).await.unwrap();
    harness
        .lifecycle
        .execute_call(call.clone(), &campaign)
        .await
        .unwrap();
    let external_id = harness
        .calls
        .find_by_id(call.id)
        .await
        .unwrap()
        .unwrap()
        .external_call_id
        .unwrap();

    harness
        .lifecycle
        .handle_callback(CallbackEvent::completed(external_id.clone(), 10))
        .await
        .unwrap();
    // The provider retries the webhook after the call already settled.
    harness
        .lifecycle
        .handle_callback(CallbackEvent::completed(external_id, 10))
        .await
        .unwrap();

    let stored = harness.calls.find_by_id(call.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CallStatus::Completed);
    assert_eq!(harness.slots.active_slots(campaign.id).await.unwrap(), 0);
    assert_eq!(
        harness
            .slots
            .get_metric(campaign.id, "completed")
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn slot_is_released_even_when_metric_recording_fails() {
    let store = MetricIncrFailStore::new();
    let campaigns = Arc::new(InMemoryCampaignRepository::new());
    let calls = Arc::new(InMemoryCallRequestRepository::new());
    let slots = Arc::new(SlotCoordinator::new(
        store.clone() as Arc<dyn CoordinationStore>,
        Duration::from_secs(3600),
    ));
    let gateway = ScriptedGateway::succeeding();
    let lifecycle = Arc::new(CallLifecycleService::new(
        campaigns.clone() as Arc<dyn CampaignRepository>,
        calls.clone() as Arc<dyn CallRequestRepository>,
        gateway as Arc<dyn TelephonyGateway>,
        slots.clone(),
    ));

    let campaign = running_campaign(1);
    campaigns.save(&campaign).await.unwrap();
    let call = CallRequest::new(campaign.id, "+15550001111".to_string());
    calls.save(&call).await.unwrap();

    slots.acquire_slot(campaign.id).await.unwrap();
    lifecycle.execute_call(call.clone(), &campaign).await.unwrap();
    let external_id = calls
        .find_by_id(call.id)
        .await
        .unwrap()
        .unwrap()
        .external_call_id
        .unwrap();

    let result = lifecycle
        .handle_callback(CallbackEvent::completed(external_id, 10))
        .await;
    assert!(result.is_err());

    // The call settled terminally, so the slot must come back anyway.
    let stored = calls.find_by_id(call.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CallStatus::Completed);
    assert_eq!(slots.active_slots(campaign.id).await.unwrap(), 0);
}

#[tokio::test]
async fn watchdog_settles_overdue_calls_as_failures() {
    let harness = Harness::new();
    let campaign = running_campaign(1);
    harness.campaigns.save(&campaign).await.unwrap();
    let call = CallRequest::new(campaign.id, "+15550001111".to_string());
    harness.calls.save(&call).await.unwrap();

    harness.slots.acquire_slot(campaign.id).await.unwrap();
    harness
        .lifecycle
        .execute_call(call.clone(), &campaign)
        .await
        .unwrap();

    // Backdate the callback deadline so the sweep picks the call up.
    let mut stored = harness.calls.find_by_id(call.id).await.unwrap().unwrap();
    stored.expected_callback_by = Some(Utc::now() - ChronoDuration::seconds(5));
    harness.calls.save(&stored).await.unwrap();

    let watchdog = CallbackWatchdog::new(
        harness.calls.clone() as Arc<dyn CallRequestRepository>,
        harness.lifecycle.clone(),
        30_000,
    );
    let settled = watchdog.sweep().await.unwrap();
    assert_eq!(settled, 1);

    let stored = harness.calls.find_by_id(call.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CallStatus::Failed);
    assert!(stored
        .failure_reason
        .unwrap()
        .contains("Callback timeout"));
    assert_eq!(stored.retry_count, 1);
    assert_eq!(harness.slots.active_slots(campaign.id).await.unwrap(), 0);

    // Nothing left to settle on the next sweep.
    assert_eq!(watchdog.sweep().await.unwrap(), 0);
}

#[tokio::test]
async fn campaign_stays_open_while_other_calls_remain() {
    let harness = Harness::new();
    let campaign = running_campaign(2);
    harness.campaigns.save(&campaign).await.unwrap();
    let first = CallRequest::new(campaign.id, "+15550001111".to_string());
    let second = CallRequest::new(campaign.id, "+15550002222".to_string());
    harness.calls.save(&first).await.unwrap();
    harness.calls.save(&second).await.unwrap();

    harness.slots.acquire_slot(campaign.id).await.unwrap();
    harness
        .lifecycle
        .execute_call(first.clone(), &campaign)
        .await
        .unwrap();
    let external_id = harness
        .calls
        .find_by_id(first.id)
        .await
        .unwrap()
        .unwrap()
        .external_call_id
        .unwrap();
    harness
        .lifecycle
        .handle_callback(CallbackEvent::completed(external_id, 10))
        .await
        .unwrap();

    let stored_campaign = harness
        .campaigns
        .find_by_id(campaign.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_campaign.status, CampaignStatus::InProgress);
}

#[tokio::test]
async fn trigger_single_call_dials_immediately() {
    let harness = Harness::new();
    let call = harness
        .lifecycle
        .trigger_single_call("+15550009999".to_string())
        .await
        .unwrap();

    assert_eq!(call.status, CallStatus::InProgress);
    assert!(call.external_call_id.is_some());
    assert_eq!(harness.gateway.initiated_count(), 1);
    assert_eq!(harness.slots.active_slots(call.campaign_id).await.unwrap(), 1);
}
