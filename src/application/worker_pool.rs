//! Call dispatch worker pool
//!
//! A fixed set of tasks blocking on the shared dispatch queue. Picking up a
//! job converts the campaign's reservation from queued to active before the
//! call is handed to the lifecycle service, so capacity accounting stays
//! consistent whether the dispatch succeeds or fails.

use crate::application::call_lifecycle::CallLifecycleService;
use crate::application::scheduler::CALL_QUEUE_KEY;
use crate::application::slot_coordinator::SlotCoordinator;
use crate::config::WorkerConfig;
use crate::domain::call::CallRequestRepository;
use crate::domain::campaign::CampaignRepository;
use crate::domain::coordination::CoordinationStore;
use crate::domain::shared::result::Result;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct CallWorkerPool {
    campaigns: Arc<dyn CampaignRepository>,
    calls: Arc<dyn CallRequestRepository>,
    store: Arc<dyn CoordinationStore>,
    slots: Arc<SlotCoordinator>,
    lifecycle: Arc<CallLifecycleService>,
    config: WorkerConfig,
    running: AtomicBool,
    active_workers: AtomicUsize,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl CallWorkerPool {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        calls: Arc<dyn CallRequestRepository>,
        store: Arc<dyn CoordinationStore>,
        slots: Arc<SlotCoordinator>,
        lifecycle: Arc<CallLifecycleService>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            campaigns,
            calls,
            store,
            slots,
            lifecycle,
            config,
            running: AtomicBool::new(false),
            active_workers: AtomicUsize::new(0),
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn start(self: &Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        let mut handles = self.handles.lock().unwrap();
        for worker_id in 0..self.config.pool_size {
            let pool = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                pool.worker_loop(worker_id).await;
            }));
        }
        info!("Worker pool started with {} workers", self.config.pool_size);
    }

    async fn worker_loop(&self, worker_id: usize) {
        let poll_timeout = Duration::from_millis(self.config.queue_poll_timeout_ms);
        debug!("Worker {} started", worker_id);
        while self.running.load(Ordering::SeqCst) {
            match self.store.queue_pop(CALL_QUEUE_KEY, poll_timeout).await {
                Ok(Some(job)) => {
                    self.active_workers.fetch_add(1, Ordering::SeqCst);
                    if let Err(e) = self.process_job(&job).await {
                        error!("Worker {} failed on job {}: {}", worker_id, job, e);
                    }
                    self.active_workers.fetch_sub(1, Ordering::SeqCst);
                }
                Ok(None) => {
                    // Poll timeout, loop back to re-check the running flag.
                }
                Err(e) => {
                    error!("Worker {} queue pop failed: {}", worker_id, e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
        debug!("Worker {} stopped", worker_id);
    }

    async fn process_job(&self, job: &str) -> Result<()> {
        let call_id = match Uuid::parse_str(job) {
            Ok(id) => id,
            Err(_) => {
                warn!("Discarding malformed queue entry: {}", job);
                return Ok(());
            }
        };

        let call = match self.calls.find_by_id(call_id).await? {
            Some(call) => call,
            None => {
                warn!("Queued call {} no longer exists, skipping", call_id);
                return Ok(());
            }
        };
        let campaign_id = call.campaign_id;

        // queued -> active: the scheduler's clamp already enforced the
        // concurrency limit when it reserved the queued count.
        self.slots.decr_queued(campaign_id).await?;
        self.slots.acquire_slot(campaign_id).await?;

        let campaign = match self.campaigns.find_by_id(campaign_id).await {
            Ok(Some(campaign)) => campaign,
            Ok(None) => {
                warn!(
                    "Campaign {} for queued call {} no longer exists",
                    campaign_id, call_id
                );
                self.slots.release_slot(campaign_id).await?;
                return Ok(());
            }
            Err(e) => {
                // Do not leak the freshly claimed slot on a store error.
                self.slots.release_slot(campaign_id).await?;
                return Err(e);
            }
        };

        // execute_call owns the slot from here: every failure path inside
        // it releases exactly once.
        self.lifecycle.execute_call(call, &campaign).await
    }

    pub async fn queue_depth(&self) -> Result<i64> {
        self.store.queue_len(CALL_QUEUE_KEY).await
    }

    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    pub fn active_worker_count(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Stops accepting jobs and waits for in-flight calls to settle, up to
    /// the configured grace period, then aborts the workers.
    pub async fn shutdown(&self) {
        info!("Worker pool shutting down");
        self.running.store(false, Ordering::SeqCst);

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.config.shutdown_wait_seconds);
        while self.active_worker_count() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if self.active_worker_count() > 0 {
            warn!(
                "{} worker(s) still busy after grace period, aborting",
                self.active_worker_count()
            );
        }

        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            handle.abort();
        }
        info!("Worker pool stopped");
    }
}
