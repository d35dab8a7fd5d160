//! Outdial - an outbound call campaign dispatcher
//!
//! This is a Domain-Driven Design (DDD) implementation of a campaign
//! dialing system: campaigns own batches of phone numbers, a scheduling
//! loop distributes concurrency slots across them, and a worker pool
//! drives each call through a telephony gateway to a terminal state.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
