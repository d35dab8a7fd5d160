//! API interface implementations

pub mod call_handler;
pub mod campaign_handler;
pub mod dto;
pub mod metrics_handler;
pub mod router;

pub use campaign_handler::AppState;
pub use metrics_handler::{init_metrics, record_system_gauges};
pub use router::build_router;
