//! Coordination store adapters

pub mod memory;

pub use memory::InMemoryCoordinationStore;
