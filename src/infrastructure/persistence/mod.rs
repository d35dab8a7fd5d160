//! Persistence implementations

pub mod memory;
#[cfg(feature = "postgres")]
pub mod database;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{InMemoryCallRequestRepository, InMemoryCampaignRepository};

#[cfg(feature = "postgres")]
pub use database::{create_pool, run_migrations, DatabaseConfig};
#[cfg(feature = "postgres")]
pub use postgres::{PgCallRequestRepository, PgCampaignRepository};
