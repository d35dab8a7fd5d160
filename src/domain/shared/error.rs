//! Domain errors

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Telephony error: {0}")]
    Telephony(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn campaign_not_found(id: uuid::Uuid) -> Self {
        Self::NotFound(format!("Campaign not found: {}", id))
    }

    pub fn call_not_found(id: uuid::Uuid) -> Self {
        Self::NotFound(format!("Call request not found: {}", id))
    }
}
