//! Call request bounded context

pub mod callback;
pub mod entity;
pub mod repository;

pub use callback::{CallbackEvent, CallbackOutcome};
pub use entity::{CallRequest, CallStatus};
pub use repository::CallRequestRepository;
