//! Two sales houses, eleven channels.
//!
//! Sirius is bought on "All 18-60" and Space on "W 30+" with a 500 000 budget.
//! The second variant buys both sales houses on "W 30+" and labels the split as
//! optimized by TRP.

use crate::audience::{BuyingAudience, OptimizationGoal};
use crate::campaign::CampaignInput;
use crate::error::Result;

const SIRIUS_SPACE_JSON: &str = include_str!("sirius_space.json");

// Register these datasets in the catalog
inventory::submit!(crate::datasets::DatasetEntry {
    short_name: "sirius_space",
    description: "Sirius (All 18-60) and Space (W 30+), 500 000 budget",
    load,
});

inventory::submit!(crate::datasets::DatasetEntry {
    short_name: "sirius_space_w30",
    description: "Sirius and Space both on W 30+, labelled by TRP",
    load: load_w30,
});

pub fn load() -> Result<CampaignInput> {
    CampaignInput::from_json_str(SIRIUS_SPACE_JSON)
}

fn load_w30() -> Result<CampaignInput> {
    Ok(load()?
        .with_buying_audience_for_all(BuyingAudience::Women30Plus)
        .with_optimization_goal(OptimizationGoal::Trp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_w30_variant_reprices_sirius() {
        let allocation = load_w30().unwrap().run().unwrap();
        let ictv = allocation.channel("ICTV").unwrap();
        assert_eq!(ictv.buying_audience, BuyingAudience::Women30Plus);
        assert_eq!(ictv.price, 19500.0);
        assert_eq!(ictv.baseline_budget, 19500.0 * 22.0);
        assert_eq!(allocation.optimization_goal, OptimizationGoal::Trp);
    }
}
