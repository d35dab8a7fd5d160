//! Priority-weighted slot distribution
//!
//! Allocates slots proportionally to campaign priority; any campaign with
//! spare capacity is guaranteed at least one slot while slots remain.

use crate::domain::campaign::entity::Campaign;
use crate::domain::scheduling::context::SchedulingContext;
use std::collections::HashMap;
use uuid::Uuid;

pub fn distribute(
    campaigns: &[Campaign],
    total_slots: usize,
    context: &SchedulingContext,
) -> HashMap<Uuid, usize> {
    let mut allocation = HashMap::new();
    if campaigns.is_empty() || total_slots == 0 {
        return allocation;
    }

    let mut sorted: Vec<&Campaign> = campaigns.iter().collect();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut total_priority: i64 = sorted.iter().map(|c| c.priority as i64).sum();
    if total_priority == 0 {
        total_priority = sorted.len() as i64;
    }

    let mut remaining = total_slots;

    for campaign in sorted {
        if remaining == 0 {
            break;
        }
        let available = context.available_slots(campaign).max(0) as usize;
        if available == 0 {
            continue;
        }

        let proportional =
            (campaign.priority as f64 / total_priority as f64 * total_slots as f64).ceil() as usize;
        let allocated = proportional.max(1).min(available).min(remaining);

        if allocated > 0 {
            allocation.insert(campaign.id, allocated);
            remaining -= allocated;
        }
    }

    allocation
}
