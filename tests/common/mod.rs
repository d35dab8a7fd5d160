//! Shared test harness: in-memory adapters wired like production, plus a
//! scripted telephony gateway with deterministic outcomes.

#![allow(dead_code)]

use async_trait::async_trait;
use outdial::application::{CallLifecycleService, SlotCoordinator};
use outdial::domain::call::CallRequestRepository;
use outdial::domain::campaign::{BusinessHours, Campaign, CampaignRepository, CampaignStatus};
use outdial::domain::coordination::CoordinationStore;
use outdial::domain::shared::error::DomainError;
use outdial::domain::telephony::TelephonyGateway;
use outdial::infrastructure::coordination::InMemoryCoordinationStore;
use outdial::infrastructure::persistence::{
    InMemoryCallRequestRepository, InMemoryCampaignRepository,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Gateway with scripted, deterministic behavior.
pub struct ScriptedGateway {
    always_fail: AtomicBool,
    counter: AtomicUsize,
    pub initiated: Mutex<Vec<(Uuid, String)>>,
}

impl ScriptedGateway {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            always_fail: AtomicBool::new(false),
            counter: AtomicUsize::new(0),
            initiated: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        let gateway = Self::succeeding();
        gateway.always_fail.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn set_failing(&self, failing: bool) {
        self.always_fail.store(failing, Ordering::SeqCst);
    }

    pub fn initiated_count(&self) -> usize {
        self.initiated.lock().unwrap().len()
    }
}

#[async_trait]
impl TelephonyGateway for ScriptedGateway {
    async fn initiate_call(&self, phone_number: &str, call_request_id: Uuid) -> outdial::Result<String> {
        if self.always_fail.load(Ordering::SeqCst) {
            return Err(DomainError::Telephony("scripted failure".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.initiated
            .lock()
            .unwrap()
            .push((call_request_id, phone_number.to_string()));
        Ok(format!("ext-{}", n))
    }
}

/// Store wrapper that rejects metric increments while passing everything
/// else through, for exercising bookkeeping failures on terminal calls.
pub struct MetricIncrFailStore {
    inner: Arc<InMemoryCoordinationStore>,
}

impl MetricIncrFailStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(InMemoryCoordinationStore::new()),
        })
    }
}

#[async_trait]
impl CoordinationStore for MetricIncrFailStore {
    async fn queue_push(&self, queue: &str, value: &str) -> outdial::Result<()> {
        self.inner.queue_push(queue, value).await
    }

    async fn queue_pop(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> outdial::Result<Option<String>> {
        self.inner.queue_pop(queue, timeout).await
    }

    async fn queue_len(&self, queue: &str) -> outdial::Result<i64> {
        self.inner.queue_len(queue).await
    }

    async fn incr(&self, key: &str) -> outdial::Result<i64> {
        if key.contains(":metrics:") {
            return Err(DomainError::Infrastructure(
                "metric counter unavailable".to_string(),
            ));
        }
        self.inner.incr(key).await
    }

    async fn decr(&self, key: &str) -> outdial::Result<i64> {
        self.inner.decr(key).await
    }

    async fn get(&self, key: &str) -> outdial::Result<Option<i64>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: i64) -> outdial::Result<()> {
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> outdial::Result<()> {
        self.inner.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> outdial::Result<()> {
        self.inner.expire(key, ttl).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> outdial::Result<Vec<String>> {
        self.inner.keys_with_prefix(prefix).await
    }
}

pub struct Harness {
    pub campaigns: Arc<InMemoryCampaignRepository>,
    pub calls: Arc<InMemoryCallRequestRepository>,
    pub store: Arc<InMemoryCoordinationStore>,
    pub slots: Arc<SlotCoordinator>,
    pub gateway: Arc<ScriptedGateway>,
    pub lifecycle: Arc<CallLifecycleService>,
}

impl Harness {
    pub fn with_gateway(gateway: Arc<ScriptedGateway>) -> Self {
        let campaigns = Arc::new(InMemoryCampaignRepository::new());
        let calls = Arc::new(InMemoryCallRequestRepository::new());
        let store = Arc::new(InMemoryCoordinationStore::new());
        let slots = Arc::new(SlotCoordinator::new(
            store.clone() as Arc<dyn CoordinationStore>,
            Duration::from_secs(3600),
        ));
        let lifecycle = Arc::new(CallLifecycleService::new(
            campaigns.clone() as Arc<dyn CampaignRepository>,
            calls.clone() as Arc<dyn CallRequestRepository>,
            gateway.clone() as Arc<dyn TelephonyGateway>,
            slots.clone(),
        ));
        Self {
            campaigns,
            calls,
            store,
            slots,
            gateway,
            lifecycle,
        }
    }

    pub fn new() -> Self {
        Self::with_gateway(ScriptedGateway::succeeding())
    }
}

/// An `IN_PROGRESS` campaign with an always-open calling window.
pub fn running_campaign(limit: i32) -> Campaign {
    let mut campaign = Campaign::new(format!("campaign-{}", Uuid::new_v4()), None);
    campaign.status = CampaignStatus::InProgress;
    campaign.concurrency_limit = limit;
    campaign.business_hours = BusinessHours::all_day();
    campaign
}

/// Polls `check` until it returns true or the timeout elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
