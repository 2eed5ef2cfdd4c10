//! Campaigns shared by the unit tests

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};

use crate::allocator::Allocation;
use crate::audience::{AudienceRate, AudienceRates, BuyingAudience, BuyingAudienceMap, OptimizationGoal};
use crate::campaign::CampaignInput;
use crate::channels::{AffinityTable, RateTable};
use crate::datasets;
use crate::logging;

/// The built-in Sirius/Space campaign
pub fn sample_campaign() -> CampaignInput {
    logging::init_test();
    datasets::sirius_space::load().expect("built-in dataset must load")
}

pub fn sample_allocation() -> Allocation {
    sample_campaign().run().expect("sample campaign must allocate")
}

/// Create a log-normal distribution from mean and standard deviation
fn lognormal_dist(mean: f64, stddev: f64) -> LogNormal<f64> {
    let sigma_squared = (1.0 + (stddev * stddev) / (mean * mean)).ln();
    let mu = mean.ln() - sigma_squared / 2.0;
    LogNormal::new(mu, sigma_squared.sqrt()).expect("valid log-normal parameters")
}

/// Random campaign with 1-4 sales houses of 1-8 channels each.
///
/// Prices and ratings are log-normal around typical TV values, about one
/// channel in six has no affinity row, and the budget is somewhere between
/// a tenth and twice the summed baseline.
pub fn random_campaign(seed: u64) -> CampaignInput {
    let mut rng = StdRng::seed_from_u64(seed);
    let price_dist = lognormal_dist(9000.0, 4000.0);
    let rating_dist = lognormal_dist(10.0, 6.0);

    let mut rate_tables = Vec::new();
    let mut affinity_tables = HashMap::new();
    let mut buying_audiences = BuyingAudienceMap::new();
    let mut baseline_guess = 0.0;

    let house_count = rng.gen_range(1..=4);
    for h in 0..house_count {
        let sales_house = format!("House{}", h);
        let audience = if rng.gen_bool(0.5) {
            BuyingAudience::All18To60
        } else {
            BuyingAudience::Women30Plus
        };
        buying_audiences.set(sales_house.clone(), audience);

        let mut rates = RateTable::new(sales_house.clone());
        let mut affinities = AffinityTable::new(sales_house.clone());
        let channel_count = rng.gen_range(1..=8);
        for c in 0..channel_count {
            let channel = format!("H{}-C{}", h, c);
            let mut sample = || AudienceRate {
                price: price_dist.sample(&mut rng).round(),
                rating: (rating_dist.sample(&mut rng) * 10.0).round() / 10.0,
            };
            let audience_rates = AudienceRates {
                all_18_60: sample(),
                women_30_plus: sample(),
            };
            let chosen = audience_rates.for_audience(audience);
            rates.push(channel.clone(), audience_rates);

            // Keep the first channel of every house so no house ends up empty
            if c == 0 || rng.gen_range(0..6) != 0 {
                affinities.push(channel, rng.gen_range(50.0..100.0));
                baseline_guess += chosen.price * chosen.rating;
            }
        }
        rate_tables.push(rates);
        affinity_tables.insert(sales_house, affinities);
    }

    let total_budget = (baseline_guess * rng.gen_range(0.1..2.0)).max(1.0);
    CampaignInput {
        rate_tables,
        affinity_tables,
        buying_audiences,
        total_budget,
        optimization_goal: OptimizationGoal::Aff,
    }
}
