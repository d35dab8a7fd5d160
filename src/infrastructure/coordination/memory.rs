//! In-memory coordination store
//!
//! Single-process stand-in for the shared coordination service: FIFO
//! queues guarded by a mutex with a `Notify`-based blocking pop, and
//! integer counters with lazily evaluated expiry.

use crate::domain::coordination::CoordinationStore;
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
struct CounterEntry {
    value: i64,
    expires_at: Option<Instant>,
}

impl CounterEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[derive(Default)]
pub struct InMemoryCoordinationStore {
    counters: Mutex<HashMap<String, CounterEntry>>,
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    push_notify: Notify,
}

impl InMemoryCoordinationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_counter<T>(&self, key: &str, f: impl FnOnce(&mut Option<&mut CounterEntry>) -> T) -> T {
        let mut counters = self.counters.lock().unwrap();
        if counters.get(key).map(|e| e.is_expired()).unwrap_or(false) {
            counters.remove(key);
        }
        f(&mut counters.get_mut(key))
    }
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn queue_push(&self, queue: &str, value: &str) -> Result<()> {
        self.queues
            .lock()
            .unwrap()
            .entry(queue.to_string())
            .or_default()
            .push_back(value.to_string());
        self.push_notify.notify_waiters();
        Ok(())
    }

    async fn queue_pop(&self, queue: &str, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.push_notify.notified();
            tokio::pin!(notified);
            // Register for wakeups before checking the queue so a push
            // between the check and the await is not missed.
            notified.as_mut().enable();

            if let Some(value) = self
                .queues
                .lock()
                .unwrap()
                .get_mut(queue)
                .and_then(|q| q.pop_front())
            {
                return Ok(Some(value));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let _ = tokio::time::timeout(deadline - now, notified).await;
        }
    }

    async fn queue_len(&self, queue: &str) -> Result<i64> {
        Ok(self
            .queues
            .lock()
            .unwrap()
            .get(queue)
            .map(|q| q.len() as i64)
            .unwrap_or(0))
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut counters = self.counters.lock().unwrap();
        let entry = counters
            .entry(key.to_string())
            .and_modify(|e| {
                if e.is_expired() {
                    e.value = 0;
                    e.expires_at = None;
                }
            })
            .or_insert(CounterEntry {
                value: 0,
                expires_at: None,
            });
        entry.value += 1;
        Ok(entry.value)
    }

    async fn decr(&self, key: &str) -> Result<i64> {
        let mut counters = self.counters.lock().unwrap();
        let entry = counters
            .entry(key.to_string())
            .and_modify(|e| {
                if e.is_expired() {
                    e.value = 0;
                    e.expires_at = None;
                }
            })
            .or_insert(CounterEntry {
                value: 0,
                expires_at: None,
            });
        entry.value -= 1;
        Ok(entry.value)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.with_counter(key, |entry| entry.as_ref().map(|e| e.value)))
    }

    async fn set(&self, key: &str, value: i64) -> Result<()> {
        self.counters.lock().unwrap().insert(
            key.to_string(),
            CounterEntry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.counters.lock().unwrap().remove(key);
        self.queues.lock().unwrap().remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.with_counter(key, |entry| {
            if let Some(e) = entry {
                e.expires_at = Some(Instant::now() + ttl);
            }
        });
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let counters = self.counters.lock().unwrap();
        Ok(counters
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && !e.is_expired())
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_is_fifo() {
        let store = InMemoryCoordinationStore::new();
        store.queue_push("q", "a").await.unwrap();
        store.queue_push("q", "b").await.unwrap();

        assert_eq!(store.queue_len("q").await.unwrap(), 2);
        assert_eq!(
            store.queue_pop("q", Duration::from_millis(10)).await.unwrap(),
            Some("a".to_string())
        );
        assert_eq!(
            store.queue_pop("q", Duration::from_millis(10)).await.unwrap(),
            Some("b".to_string())
        );
    }

    #[tokio::test]
    async fn pop_times_out_on_empty_queue() {
        let store = InMemoryCoordinationStore::new();
        let popped = store.queue_pop("q", Duration::from_millis(20)).await.unwrap();
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn pop_wakes_on_concurrent_push() {
        let store = std::sync::Arc::new(InMemoryCoordinationStore::new());
        let popper = {
            let store = store.clone();
            tokio::spawn(async move { store.queue_pop("q", Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.queue_push("q", "late").await.unwrap();

        let popped = popper.await.unwrap().unwrap();
        assert_eq!(popped, Some("late".to_string()));
    }

    #[tokio::test]
    async fn counters_increment_and_decrement() {
        let store = InMemoryCoordinationStore::new();
        assert_eq!(store.incr("k").await.unwrap(), 1);
        assert_eq!(store.incr("k").await.unwrap(), 2);
        assert_eq!(store.decr("k").await.unwrap(), 1);
        assert_eq!(store.get("k").await.unwrap(), Some(1));

        store.set("k", 42).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(42));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_keys_vanish() {
        let store = InMemoryCoordinationStore::new();
        store.set("k", 7).await.unwrap();
        store.expire("k", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.keys_with_prefix("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prefix_listing_matches() {
        let store = InMemoryCoordinationStore::new();
        store.set("campaign:1:queued", 1).await.unwrap();
        store.set("campaign:2:queued", 2).await.unwrap();
        store.set("worker:active", 3).await.unwrap();

        let keys = store.keys_with_prefix("campaign:").await.unwrap();
        assert_eq!(keys.len(), 2);
    }
}
