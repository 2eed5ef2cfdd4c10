//! Joins rate tables with affinity tables and resolves the price/rating pair
//! each sales house is bought at.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::audience::{BuyingAudience, BuyingAudienceMap};
use crate::channels::{AffinityRow, AffinityTable, RateTable};
use crate::error::ConfigurationError;

/// A channel that has both rates and an affinity, priced for its sales house's audience
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedChannel {
    pub channel: String,
    pub sales_house: String,
    pub buying_audience: BuyingAudience,
    pub affinity: f64,
    pub price: f64,
    pub rating: f64,
}

/// A rate row that found no affinity row and was left out of the merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinMiss {
    pub sales_house: String,
    pub channel: String,
}

/// Result of merging: the joined channels plus what was dropped on the way
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MergeOutcome {
    pub channels: Vec<MergedChannel>,
    pub join_misses: Vec<JoinMiss>,
}

impl MergeOutcome {
    pub fn excluded_count(&self) -> usize {
        self.join_misses.len()
    }

    /// Sales houses in merge order, each listed once
    #[cfg(test)]
    pub fn sales_houses(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.channels
            .iter()
            .map(|c| c.sales_house.as_str())
            .filter(|house| seen.insert(*house))
            .collect()
    }
}

/// Index an affinity table by channel name, rejecting duplicate channels
fn index_affinities(table: &AffinityTable) -> Result<HashMap<&str, &AffinityRow>, ConfigurationError> {
    let mut index = HashMap::with_capacity(table.rows.len());
    for row in &table.rows {
        if index.insert(row.channel.as_str(), row).is_some() {
            return Err(ConfigurationError::DuplicateChannel {
                sales_house: table.sales_house.clone(),
                channel: row.channel.clone(),
                table: "affinity",
            });
        }
    }
    Ok(index)
}

/// Merge rate and affinity tables into one flat list of priced channels.
///
/// # Arguments
/// * `rate_tables` - Rate tables in sales house order; this order is kept in the output
/// * `affinity_tables` - Affinity tables keyed by sales house name
/// * `buying_audiences` - Buying audience of every sales house that has a rate table
///
/// Every sales house must have a buying audience before anything is joined.
/// Channels without an affinity row are dropped and reported as join misses.
pub fn merge(
    rate_tables: &[RateTable],
    affinity_tables: &HashMap<String, AffinityTable>,
    buying_audiences: &BuyingAudienceMap,
) -> Result<MergeOutcome, ConfigurationError> {
    let audiences = rate_tables
        .iter()
        .map(|table| buying_audiences.resolve(&table.sales_house))
        .collect::<Result<Vec<_>, _>>()?;

    let mut outcome = MergeOutcome::default();

    for (table, audience) in rate_tables.iter().zip(audiences) {
        let affinity_index = match affinity_tables.get(&table.sales_house) {
            Some(affinity_table) => index_affinities(affinity_table)?,
            None => {
                warn!(sales_house = %table.sales_house, "no affinity table for sales house, all its channels are excluded");
                HashMap::new()
            }
        };

        for row in &table.rows {
            match affinity_index.get(row.channel.as_str()) {
                Some(affinity_row) => {
                    let rate = row.rates.for_audience(audience);
                    outcome.channels.push(MergedChannel {
                        channel: row.channel.clone(),
                        sales_house: table.sales_house.clone(),
                        buying_audience: audience,
                        affinity: affinity_row.affinity,
                        price: rate.price,
                        rating: rate.rating,
                    });
                }
                None => {
                    debug!(sales_house = %table.sales_house, channel = %row.channel, "channel has no affinity row, excluded");
                    outcome.join_misses.push(JoinMiss {
                        sales_house: table.sales_house.clone(),
                        channel: row.channel.clone(),
                    });
                }
            }
        }
    }

    if !outcome.join_misses.is_empty() {
        warn!(excluded = outcome.excluded_count(), "channels without affinity were excluded from the split");
    }

    Ok(outcome)
}
