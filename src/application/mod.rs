//! Application layer - use cases composed from domain ports

pub mod call_lifecycle;
pub mod campaign_service;
pub mod metrics;
pub mod scheduler;
pub mod slot_coordinator;
pub mod startup_sync;
pub mod watchdog;
pub mod worker_pool;

pub use call_lifecycle::CallLifecycleService;
pub use campaign_service::{CampaignService, ImportOutcome, NewCampaign};
pub use metrics::{CampaignMetrics, CampaignMetricsService, GlobalMetrics, GlobalMetricsService};
pub use scheduler::{CallScheduler, CALL_QUEUE_KEY};
pub use slot_coordinator::SlotCoordinator;
pub use startup_sync::StartupSync;
pub use watchdog::CallbackWatchdog;
pub use worker_pool::CallWorkerPool;
