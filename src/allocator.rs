//! Proportional split of a campaign budget over merged channels.
//!
//! Every channel gets the part of the total budget that its baseline
//! (rating * price) has of the summed baseline, bought in whole slots.
//! There is no solver here; the optimization goal only labels the result.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::audience::{BuyingAudience, OptimizationGoal};
use crate::error::{ConfigurationError, DegenerateInputError, Result};
use crate::merger::{JoinMiss, MergeOutcome, MergedChannel};
use crate::sales_houses::{house_baselines, split_by_sales_house, Corridor, SalesHouseSplit};

/// A merged channel with its standard and optimized budgets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocatedChannel {
    pub channel: String,
    pub sales_house: String,
    pub buying_audience: BuyingAudience,
    pub affinity: f64,
    pub price: f64,
    pub rating: f64,
    /// Standard budget: rating * price
    pub baseline_budget: f64,
    /// Fraction of the summed baseline, in 0..=1
    pub baseline_share: f64,
    /// Unrounded proportional part of the campaign budget
    pub target_budget: f64,
    pub allocated_slots: u64,
    pub allocated_budget: f64,
    pub allocated_affinity: f64,
    pub allocated_rating: f64,
    pub baseline_share_pct: f64,
    pub allocated_share_pct: f64,
    /// Part of its own sales house's allocated budget
    pub house_allocated_share_pct: f64,
    pub corridor: Corridor,
}

/// Campaign level sums
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CampaignTotals {
    pub baseline_budget: f64,
    pub allocated_budget: f64,
    pub allocated_affinity: f64,
    pub allocated_rating: f64,
    pub allocated_slots: u64,
}

/// Complete result of one allocation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub optimization_goal: OptimizationGoal,
    pub total_budget: f64,
    pub channels: Vec<AllocatedChannel>,
    pub totals: CampaignTotals,
    pub sales_houses: Vec<SalesHouseSplit>,
    pub join_misses: Vec<JoinMiss>,
}

impl Allocation {
    #[cfg(test)]
    pub fn channel(&self, name: &str) -> Option<&AllocatedChannel> {
        self.channels.iter().find(|c| c.channel == name)
    }

    /// Channels whose rounded budget left their tolerance corridor
    pub fn outside_corridor(&self) -> impl Iterator<Item = &AllocatedChannel> {
        self.channels.iter().filter(|c| !c.corridor.within)
    }

    /// Unspent (negative when overspent) part of the campaign budget after rounding
    pub fn rounding_remainder(&self) -> f64 {
        self.total_budget - self.totals.allocated_budget
    }
}

/// Per channel values that do not depend on campaign totals
struct ChannelDraft<'a> {
    merged: &'a MergedChannel,
    baseline_budget: f64,
    baseline_share: f64,
    target_budget: f64,
    allocated_slots: u64,
    allocated_budget: f64,
}

impl ChannelDraft<'_> {
    fn allocated_affinity(&self) -> f64 {
        self.allocated_slots as f64 * self.merged.affinity
    }

    fn allocated_rating(&self) -> f64 {
        self.allocated_slots as f64 * self.merged.rating
    }
}

/// Whole slots that best match a target budget at a given slot price.
/// A free channel never gets slots: its baseline, and therefore its target, is zero.
/// A slot count that does not fit in `u64` is an error rather than a saturated count.
fn slots_for(channel: &MergedChannel, target_budget: f64) -> std::result::Result<u64, DegenerateInputError> {
    if channel.price <= 0.0 {
        return Ok(0);
    }
    let slots = (target_budget / channel.price).round();
    // u64::MAX as f64 rounds up to 2^64, which itself does not fit
    if !slots.is_finite() || slots >= u64::MAX as f64 {
        return Err(DegenerateInputError::SlotCountOutOfRange {
            sales_house: channel.sales_house.clone(),
            channel: channel.channel.clone(),
            slots,
        });
    }
    Ok(slots as u64)
}

fn check_channel(channel: &MergedChannel) -> std::result::Result<(), ConfigurationError> {
    for (field, value) in [("price", channel.price), ("rating", channel.rating)] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(ConfigurationError::InvalidValue {
                sales_house: channel.sales_house.clone(),
                channel: channel.channel.clone(),
                field,
                value,
            });
        }
    }
    if !channel.affinity.is_finite() {
        return Err(ConfigurationError::InvalidValue {
            sales_house: channel.sales_house.clone(),
            channel: channel.channel.clone(),
            field: "affinity",
            value: channel.affinity,
        });
    }
    Ok(())
}

/// Split `total_budget` over the merged channels in proportion to their baselines.
///
/// # Arguments
/// * `merged` - Output of the merger; channel order is kept
/// * `total_budget` - Campaign budget, positive and finite
/// * `optimization_goal` - Carried through to the result as a label
///
/// # Errors
/// Invalid budgets or channel values are configuration errors. An empty merge,
/// a zero baseline (overall or for any sales house) or a zero budget after
/// rounding are degenerate inputs.
pub fn allocate(merged: &MergeOutcome, total_budget: f64, optimization_goal: OptimizationGoal) -> Result<Allocation> {
    if !(total_budget.is_finite() && total_budget > 0.0) {
        return Err(ConfigurationError::InvalidBudget(total_budget).into());
    }
    for channel in &merged.channels {
        check_channel(channel)?;
    }
    if merged.channels.is_empty() {
        return Err(DegenerateInputError::NoChannels.into());
    }

    let baselines: Vec<f64> = merged.channels.iter().map(|c| c.rating * c.price).collect();
    let total_baseline: f64 = baselines.iter().sum();
    if total_baseline <= 0.0 {
        return Err(DegenerateInputError::ZeroBaselineBudget.into());
    }

    let house_totals = house_baselines(
        merged.channels.iter().zip(&baselines).map(|(c, &b)| (c.sales_house.as_str(), b)),
    );
    if let Some((sales_house, _)) = house_totals.iter().find(|(_, baseline)| *baseline <= 0.0) {
        return Err(DegenerateInputError::ZeroSalesHouseBaseline(sales_house.clone()).into());
    }

    let drafts = merged
        .channels
        .iter()
        .zip(&baselines)
        .map(|(channel, &baseline_budget)| {
            let baseline_share = baseline_budget / total_baseline;
            let target_budget = total_budget * baseline_share;
            let allocated_slots = slots_for(channel, target_budget)?;
            Ok(ChannelDraft {
                merged: channel,
                baseline_budget,
                baseline_share,
                target_budget,
                allocated_slots,
                allocated_budget: allocated_slots as f64 * channel.price,
            })
        })
        .collect::<std::result::Result<Vec<ChannelDraft>, DegenerateInputError>>()?;

    let totals = drafts.iter().try_fold(
        CampaignTotals {
            baseline_budget: total_baseline,
            ..CampaignTotals::default()
        },
        |acc, draft| {
            let allocated_slots = acc.allocated_slots.checked_add(draft.allocated_slots)?;
            Some(CampaignTotals {
                baseline_budget: acc.baseline_budget,
                allocated_budget: acc.allocated_budget + draft.allocated_budget,
                allocated_affinity: acc.allocated_affinity + draft.allocated_affinity(),
                allocated_rating: acc.allocated_rating + draft.allocated_rating(),
                allocated_slots,
            })
        },
    );
    let totals = totals.ok_or_else(|| DegenerateInputError::SlotTotalOverflow {
        scope: "the campaign".to_string(),
    })?;
    if totals.allocated_budget <= 0.0 {
        return Err(DegenerateInputError::ZeroAllocatedBudget.into());
    }

    let house_lookup: HashMap<&str, f64> = house_totals.iter().map(|(h, b)| (h.as_str(), *b)).collect();
    let mut house_allocated: HashMap<&str, f64> = HashMap::with_capacity(house_totals.len());
    for draft in &drafts {
        *house_allocated.entry(draft.merged.sales_house.as_str()).or_insert(0.0) += draft.allocated_budget;
    }

    let channels: Vec<AllocatedChannel> = drafts
        .iter()
        .map(|draft| {
            let house_baseline = house_lookup
                .get(draft.merged.sales_house.as_str())
                .copied()
                .unwrap_or(total_baseline);
            let house_allocated_budget = house_allocated
                .get(draft.merged.sales_house.as_str())
                .copied()
                .unwrap_or(0.0);
            AllocatedChannel {
                channel: draft.merged.channel.clone(),
                sales_house: draft.merged.sales_house.clone(),
                buying_audience: draft.merged.buying_audience,
                affinity: draft.merged.affinity,
                price: draft.merged.price,
                rating: draft.merged.rating,
                baseline_budget: draft.baseline_budget,
                baseline_share: draft.baseline_share,
                target_budget: draft.target_budget,
                allocated_slots: draft.allocated_slots,
                allocated_budget: draft.allocated_budget,
                allocated_affinity: draft.allocated_affinity(),
                allocated_rating: draft.allocated_rating(),
                baseline_share_pct: draft.baseline_budget / total_baseline * 100.0,
                allocated_share_pct: draft.allocated_budget / totals.allocated_budget * 100.0,
                house_allocated_share_pct: if house_allocated_budget > 0.0 {
                    draft.allocated_budget / house_allocated_budget * 100.0
                } else {
                    0.0
                },
                corridor: Corridor::new(draft.baseline_budget, house_baseline, draft.target_budget, draft.allocated_budget),
            }
        })
        .collect();

    for channel in channels.iter().filter(|c| !c.corridor.within) {
        warn!(
            channel = %channel.channel,
            sales_house = %channel.sales_house,
            target = channel.target_budget,
            allocated = channel.allocated_budget,
            tolerance = channel.corridor.tolerance,
            "rounded budget is outside its tolerance corridor"
        );
    }

    let sales_houses = split_by_sales_house(&channels, &house_totals, &totals, total_budget)?;

    debug!(
        channels = channels.len(),
        baseline = totals.baseline_budget,
        allocated = totals.allocated_budget,
        slots = totals.allocated_slots,
        "allocation complete"
    );

    Ok(Allocation {
        optimization_goal,
        total_budget,
        channels,
        totals,
        sales_houses,
        join_misses: merged.join_misses.clone(),
    })
}
