//! Domain layer: entities, value objects and ports

pub mod call;
pub mod campaign;
pub mod coordination;
pub mod scheduling;
pub mod shared;
pub mod telephony;
