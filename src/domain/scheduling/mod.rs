//! Slot-distribution strategies
//!
//! A closed set of policies dividing a fixed slot budget among eligible
//! campaigns. Every policy honors the same contract: allocations are
//! non-negative, sum to at most the slot budget, and never exceed a
//! campaign's free capacity. Policies are pure functions of their inputs.

pub mod context;
mod priority;
mod remaining_calls;
mod round_robin;

pub use context::SchedulingContext;

use crate::domain::campaign::entity::Campaign;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingPolicy {
    #[default]
    RoundRobin,
    Priority,
    RemainingCalls,
}

impl SchedulingPolicy {
    /// Configuration lookup with a safe default: unknown names fall back
    /// to round-robin.
    pub fn from_name(name: &str) -> Self {
        match name {
            "round-robin" => Self::RoundRobin,
            "priority" => Self::Priority,
            "remaining-calls" => Self::RemainingCalls,
            other => {
                warn!(
                    "Unknown scheduling strategy '{}', falling back to round-robin",
                    other
                );
                Self::RoundRobin
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round-robin",
            Self::Priority => "priority",
            Self::RemainingCalls => "remaining-calls",
        }
    }

    /// Divide `total_slots` among `campaigns`.
    pub fn distribute(
        &self,
        campaigns: &[Campaign],
        total_slots: usize,
        context: &SchedulingContext,
    ) -> HashMap<Uuid, usize> {
        match self {
            Self::RoundRobin => round_robin::distribute(campaigns, total_slots, context),
            Self::Priority => priority::distribute(campaigns, total_slots, context),
            Self::RemainingCalls => remaining_calls::distribute(campaigns, total_slots, context),
        }
    }
}
