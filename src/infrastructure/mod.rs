//! Infrastructure layer - adapters for the domain ports

pub mod coordination;
pub mod persistence;
pub mod telephony;
