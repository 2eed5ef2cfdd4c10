//! Per sales house view of an allocation.
//!
//! A channel's budget is planned within its sales house: its share of the
//! sales house baseline decides how far rounding may move it from its
//! proportional target before it is flagged. Shares of 10% and above get a
//! 20% corridor, smaller channels 30%.

use std::collections::HashMap;

use serde::Serialize;

use crate::allocator::{AllocatedChannel, CampaignTotals};
use crate::error::DegenerateInputError;

/// Channels at or above this share of their sales house get the narrow corridor
pub const CORRIDOR_SHARE_THRESHOLD_PCT: f64 = 10.0;
pub const NARROW_TOLERANCE: f64 = 0.20;
pub const WIDE_TOLERANCE: f64 = 0.30;

/// Tolerance band around a channel's proportional target budget.
///
/// Planners traditionally put the band around the standard budget
/// (rating * price). That budget is on a different scale from the campaign
/// budget, so here the band is rescaled to the channel's proportional part of
/// the campaign budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Corridor {
    /// Channel baseline as a percentage of its sales house baseline
    pub house_share_pct: f64,
    pub tolerance: f64,
    pub lower: f64,
    pub upper: f64,
    pub within: bool,
}

impl Corridor {
    /// # Arguments
    /// * `baseline_budget` - Channel baseline (rating * price)
    /// * `house_baseline` - Sum of baselines of the channel's sales house, must be positive
    /// * `target_budget` - Unrounded proportional budget of the channel
    /// * `allocated_budget` - Budget after rounding to whole slots
    pub fn new(baseline_budget: f64, house_baseline: f64, target_budget: f64, allocated_budget: f64) -> Self {
        let house_share_pct = baseline_budget / house_baseline * 100.0;
        let tolerance = if house_share_pct >= CORRIDOR_SHARE_THRESHOLD_PCT {
            NARROW_TOLERANCE
        } else {
            WIDE_TOLERANCE
        };
        let lower = target_budget * (1.0 - tolerance);
        let upper = target_budget * (1.0 + tolerance);
        Self {
            house_share_pct,
            tolerance,
            lower,
            upper,
            within: allocated_budget >= lower && allocated_budget <= upper,
        }
    }
}

/// Totals of one sales house
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesHouseSplit {
    pub sales_house: String,
    pub channel_count: usize,
    pub baseline_budget: f64,
    pub baseline_share_pct: f64,
    /// Part of the campaign budget the sales house is entitled to by its baseline
    pub target_budget: f64,
    pub allocated_budget: f64,
    pub allocated_share_pct: f64,
    pub allocated_slots: u64,
}

/// Sum baselines per sales house, keeping first-seen order
pub fn house_baselines<'a, I>(items: I) -> Vec<(String, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut order: Vec<(String, f64)> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();
    for (house, baseline) in items {
        match positions.get(house) {
            Some(&pos) => order[pos].1 += baseline,
            None => {
                positions.insert(house, order.len());
                order.push((house.to_string(), baseline));
            }
        }
    }
    order
}

/// Build the per sales house breakdown of an allocation.
///
/// `baselines` must come from [`house_baselines`] over the same channels so the
/// order matches the merge order.
pub fn split_by_sales_house(
    channels: &[AllocatedChannel],
    baselines: &[(String, f64)],
    totals: &CampaignTotals,
    total_budget: f64,
) -> Result<Vec<SalesHouseSplit>, DegenerateInputError> {
    baselines
        .iter()
        .map(|(sales_house, baseline_budget)| {
            let (channel_count, allocated_budget, allocated_slots) = channels
                .iter()
                .filter(|c| c.sales_house == *sales_house)
                .try_fold((0usize, 0.0f64, 0u64), |(count, budget, slots), c| {
                    Some((count + 1, budget + c.allocated_budget, slots.checked_add(c.allocated_slots)?))
                })
                .ok_or_else(|| DegenerateInputError::SlotTotalOverflow {
                    scope: format!("sales house '{}'", sales_house),
                })?;

            Ok(SalesHouseSplit {
                sales_house: sales_house.clone(),
                channel_count,
                baseline_budget: *baseline_budget,
                baseline_share_pct: baseline_budget / totals.baseline_budget * 100.0,
                target_budget: baseline_budget / totals.baseline_budget * total_budget,
                allocated_budget,
                allocated_share_pct: allocated_budget / totals.allocated_budget * 100.0,
                allocated_slots,
            })
        })
        .collect()
}
