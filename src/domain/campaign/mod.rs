//! Campaign bounded context

pub mod entity;
pub mod repository;

pub use entity::{BusinessHours, Campaign, CampaignStatus, RetryConfig};
pub use repository::CampaignRepository;
