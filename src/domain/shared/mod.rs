//! Shared domain primitives

pub mod error;
pub mod result;

pub use error::DomainError;
pub use result::Result;
