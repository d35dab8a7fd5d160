//! Remaining-calls-first slot distribution
//!
//! Campaigns with fewer outstanding calls are weighted more heavily,
//! minimizing time-to-completion for near-finished campaigns and freeing
//! their concurrency budget sooner.

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
    sorted.sort_by_key(|c| context.remaining_calls(c));

    let with_capacity = sorted
        .iter()
        .filter(|c| context.available_slots(c) > 0)
        .count();
    if with_capacity == 0 {
        return allocation;
    }

    let count = sorted.len();
    let mut remaining = total_slots;

    for (index, campaign) in sorted.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        let available = context.available_slots(campaign).max(0) as usize;
        if available == 0 {
            continue;
        }

        // Earlier entries (closer to completion) carry more weight.
        let weight = (count - index) as f64 / count as f64;
        let base = ((total_slots as f64 * weight / with_capacity as f64).ceil() as usize).max(1);
        let allocated = base.min(available).min(remaining);

        if allocated > 0 {
            allocation.insert(campaign.id, allocated);
            remaining -= allocated;
        }
    }

    allocation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scheduling::context::test_support::context_for;

    fn campaign(limit: i32) -> Campaign {
        let mut c = Campaign::new("test".into(), None);
        c.concurrency_limit = limit;
        c
    }

    #[test]
    fn near_finished_campaign_is_favored() {
        let almost_done = campaign(100);
        let fresh = campaign(100);
        let ctx = context_for(&[(almost_done.id, 3, 0, 0), (fresh.id, 500, 0, 0)]);

        let allocation = distribute(&[fresh.clone(), almost_done.clone()], 10, &ctx);

        assert!(
            allocation.get(&almost_done.id).copied().unwrap_or(0)
                >= allocation.get(&fresh.id).copied().unwrap_or(0)
        );
    }

    #[test]
    fn respects_total_and_capacity_bounds() {
        let a = campaign(2);
        let b = campaign(3);
        let ctx = context_for(&[(a.id, 10, 1, 0), (b.id, 20, 0, 1)]);

        let allocation = distribute(&[a.clone(), b.clone()], 4, &ctx);

        let total: usize = allocation.values().sum();
        assert!(total <= 4);
        assert!(allocation.get(&a.id).copied().unwrap_or(0) <= 1);
        assert!(allocation.get(&b.id).copied().unwrap_or(0) <= 2);
    }

    #[test]
    fn no_capacity_means_no_allocation() {
        let a = campaign(1);
        let ctx = context_for(&[(a.id, 10, 1, 0)]);
        assert!(distribute(&[a], 5, &ctx).is_empty());
    }
}
