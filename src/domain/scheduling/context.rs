//! Per-cycle scheduling context
//!
//! Built once per scheduling cycle from durable-store counts and
//! coordination-store counters. Never persisted.

use crate::domain::campaign::entity::Campaign;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default, Clone)]
pub struct SchedulingContext {
    remaining_calls: HashMap<Uuid, i64>,
    active_slots: HashMap<Uuid, i64>,
    queued_counts: HashMap<Uuid, i64>,
}

impl SchedulingContext {
    pub fn new(
        remaining_calls: HashMap<Uuid, i64>,
        active_slots: HashMap<Uuid, i64>,
        queued_counts: HashMap<Uuid, i64>,
    ) -> Self {
        Self {
            remaining_calls,
            active_slots,
            queued_counts,
        }
    }

    pub fn remaining_calls(&self, campaign: &Campaign) -> i64 {
        self.remaining_calls.get(&campaign.id).copied().unwrap_or(0)
    }

    pub fn active_slots(&self, campaign: &Campaign) -> i64 {
        self.active_slots.get(&campaign.id).copied().unwrap_or(0)
    }

    pub fn queued_count(&self, campaign: &Campaign) -> i64 {
        self.queued_counts.get(&campaign.id).copied().unwrap_or(0)
    }

    /// Free capacity within the campaign's concurrency budget.
    pub fn available_slots(&self, campaign: &Campaign) -> i64 {
        let used = self.active_slots(campaign) + self.queued_count(campaign);
        (campaign.concurrency_limit as i64 - used).max(0)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Context builder for strategy tests.
    pub fn context_for(entries: &[(Uuid, i64, i64, i64)]) -> SchedulingContext {
        let mut remaining = HashMap::new();
        let mut active = HashMap::new();
        let mut queued = HashMap::new();
        for (id, rem, act, q) in entries {
            remaining.insert(*id, *rem);
            active.insert(*id, *act);
            queued.insert(*id, *q);
        }
        SchedulingContext::new(remaining, active, queued)
    }
}
