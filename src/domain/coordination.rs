//! Coordination store port
//!
//! A shared low-latency store offering a FIFO queue, atomic counters and
//! key expiry. Used for cross-process slot accounting and call dispatch,
//! never for durability.

use crate::domain::shared::result::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Push a value onto the tail of a FIFO queue.
    async fn queue_push(&self, queue: &str, value: &str) -> Result<()>;

    /// Pop from the head of a FIFO queue, blocking up to `timeout`.
    /// Returns `None` on timeout.
    async fn queue_pop(&self, queue: &str, timeout: Duration) -> Result<Option<String>>;

    async fn queue_len(&self, queue: &str) -> Result<i64>;

    /// Atomically increment an integer key, returning the new value.
    /// Missing keys are treated as zero.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Atomically decrement an integer key, returning the new value.
    async fn decr(&self, key: &str) -> Result<i64>;

    async fn get(&self, key: &str) -> Result<Option<i64>>;

    async fn set(&self, key: &str, value: i64) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Attach a time-to-live to a key.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// List keys matching a prefix. Only used during startup recovery.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
