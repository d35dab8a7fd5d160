//! Telephony gateway adapters

pub mod mock;

pub use mock::MockTelephonyGateway;
