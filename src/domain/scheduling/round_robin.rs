//! Fair round-robin slot distribution
//!
//! Distributes slots equally across all campaigns, capped by each
//! campaign's free capacity, so no single campaign starves the others.

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

    let per_campaign = (total_slots / campaigns.len()).max(1);
    let mut remaining = total_slots;

    for campaign in campaigns {
        if remaining == 0 {
            break;
        }
        let available = context.available_slots(campaign).max(0) as usize;
        let allocated = per_campaign.min(available).min(remaining);
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
    fn splits_slots_equally() {
        let a = campaign(10);
        let b = campaign(10);
        let ctx = context_for(&[(a.id, 100, 0, 0), (b.id, 100, 0, 0)]);

        let allocation = distribute(&[a.clone(), b.clone()], 10, &ctx);

        assert_eq!(allocation[&a.id], 5);
        assert_eq!(allocation[&b.id], 5);
    }

    #[test]
    fn caps_at_campaign_capacity() {
        let a = campaign(2);
        let b = campaign(10);
        let ctx = context_for(&[(a.id, 100, 1, 0), (b.id, 100, 0, 0)]);

        let allocation = distribute(&[a.clone(), b.clone()], 10, &ctx);

        // a has one slot free (limit 2, one active)
        assert_eq!(allocation[&a.id], 1);
        assert_eq!(allocation[&b.id], 5);
    }

    #[test]
    fn never_exceeds_total_slots() {
        let campaigns: Vec<Campaign> = (0..5).map(|_| campaign(10)).collect();
        let entries: Vec<_> = campaigns.iter().map(|c| (c.id, 100, 0, 0)).collect();
        let ctx = context_for(&entries);

        let allocation = distribute(&campaigns, 3, &ctx);

        let total: usize = allocation.values().sum();
        assert!(total <= 3);
    }

    #[test]
    fn empty_inputs_yield_empty_allocation() {
        let ctx = context_for(&[]);
        assert!(distribute(&[], 10, &ctx).is_empty());
        let a = campaign(10);
        let ctx = context_for(&[(a.id, 100, 0, 0)]);
        assert!(distribute(&[a], 0, &ctx).is_empty());
    }
}
