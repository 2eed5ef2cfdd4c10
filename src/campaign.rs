use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::allocator::{allocate, Allocation};
use crate::audience::{BuyingAudience, BuyingAudienceMap, OptimizationGoal};
use crate::channels::{AffinityTable, RateTable};
use crate::error::{ConfigurationError, Result};
use crate::merger::{merge, MergeOutcome};

/// Campaign as written in a JSON campaign file.
///
/// Rate tables are a list so the sales house order of the file is kept.
/// Buying audiences stay raw labels here and are checked in [`CampaignInput::from_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignFile {
    pub total_budget: f64,
    #[serde(default)]
    pub optimization_goal: OptimizationGoal,
    pub buying_audiences: BTreeMap<String, String>,
    pub rate_tables: Vec<RateTable>,
    pub affinity_tables: Vec<AffinityTable>,
}

/// Validated campaign ready to be merged and allocated
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignInput {
    pub rate_tables: Vec<RateTable>,
    pub affinity_tables: HashMap<String, AffinityTable>,
    pub buying_audiences: BuyingAudienceMap,
    pub total_budget: f64,
    pub optimization_goal: OptimizationGoal,
}

impl CampaignInput {
    /// Check a parsed campaign file and turn it into typed input.
    ///
    /// Unknown buying audience labels, sales houses with two tables of the same
    /// kind, duplicate channels and invalid prices, ratings or affinities are
    /// all rejected here.
    pub fn from_file(file: CampaignFile) -> std::result::Result<Self, ConfigurationError> {
        let buying_audiences = BuyingAudienceMap::from_labels(&file.buying_audiences)?;

        let mut rate_tables = file.rate_tables;
        let mut seen_houses: Vec<&str> = Vec::with_capacity(rate_tables.len());
        for table in &rate_tables {
            if seen_houses.contains(&table.sales_house.as_str()) {
                return Err(ConfigurationError::DuplicateSalesHouse {
                    sales_house: table.sales_house.clone(),
                    table: "rate",
                });
            }
            seen_houses.push(table.sales_house.as_str());
        }
        for table in &mut rate_tables {
            table.normalize()?;
        }

        let mut affinity_tables = HashMap::with_capacity(file.affinity_tables.len());
        for table in file.affinity_tables {
            table.validate()?;
            if affinity_tables.contains_key(&table.sales_house) {
                return Err(ConfigurationError::DuplicateSalesHouse {
                    sales_house: table.sales_house,
                    table: "affinity",
                });
            }
            affinity_tables.insert(table.sales_house.clone(), table);
        }

        Ok(Self {
            rate_tables,
            affinity_tables,
            buying_audiences,
            total_budget: file.total_budget,
            optimization_goal: file.optimization_goal,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CampaignFile = serde_json::from_str(json)?;
        Ok(Self::from_file(file)?)
    }

    /// Load and validate a campaign file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let campaign = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            sales_houses = campaign.rate_tables.len(),
            "loaded campaign file"
        );
        Ok(campaign)
    }

    pub fn with_total_budget(mut self, total_budget: f64) -> Self {
        self.total_budget = total_budget;
        self
    }

    pub fn with_optimization_goal(mut self, optimization_goal: OptimizationGoal) -> Self {
        self.optimization_goal = optimization_goal;
        self
    }

    /// Buy every sales house against the same audience
    pub fn with_buying_audience_for_all(mut self, audience: BuyingAudience) -> Self {
        for table in &self.rate_tables {
            self.buying_audiences.set(table.sales_house.clone(), audience);
        }
        self
    }

    pub fn merge(&self) -> std::result::Result<MergeOutcome, ConfigurationError> {
        merge(&self.rate_tables, &self.affinity_tables, &self.buying_audiences)
    }

    /// Merge the tables and split the budget
    pub fn run(&self) -> Result<Allocation> {
        let merged = self.merge()?;
        debug!(
            channels = merged.channels.len(),
            excluded = merged.excluded_count(),
            "merged rate and affinity tables"
        );
        allocate(&merged, self.total_budget, self.optimization_goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SplitError;

    const MINIMAL: &str = r#"{
        "total_budget": 1000,
        "buying_audiences": { "Solo": "All 18-60" },
        "rate_tables": [
            { "sales_house": "Solo", "rows": [
                { "channel": "A", "rates": { "All 18-60": { "price": 100, "rating": 2.0 }, "W 30+": { "price": 120, "rating": 1.5 } } },
                { "channel": "B", "rates": { "All 18-60": { "price": 50, "rating": 2.0 }, "W 30+": { "price": 60, "rating": 1.0 } } }
            ] }
        ],
        "affinity_tables": [
            { "sales_house": "Solo", "rows": [ { "channel": "A", "affinity": 90 }, { "channel": "B", "affinity": 80 } ] }
        ]
    }"#;

    #[test]
    fn test_minimal_campaign_parses_and_runs() {
        let campaign = CampaignInput::from_json_str(MINIMAL).unwrap();
        assert_eq!(campaign.optimization_goal, OptimizationGoal::Aff);
        assert_eq!(campaign.rate_tables[0].rows[0].sales_house.as_deref(), Some("Solo"));

        // Baselines 200 and 100: A gets 666.67 -> 7 slots, B gets 333.33 -> 7 slots
        let allocation = campaign.run().unwrap();
        assert_eq!(allocation.channel("A").unwrap().allocated_slots, 7);
        assert_eq!(allocation.channel("B").unwrap().allocated_slots, 7);
        assert_eq!(allocation.totals.allocated_budget, 1050.0);
    }

    #[test]
    fn test_unknown_audience_label_is_configuration_error() {
        let json = MINIMAL.replace("\"Solo\": \"All 18-60\"", "\"Solo\": \"Teens\"");
        match CampaignInput::from_json_str(&json) {
            Err(SplitError::Configuration(ConfigurationError::UnknownBuyingAudience { sales_house, audience })) => {
                assert_eq!(sales_house, "Solo");
                assert_eq!(audience, "Teens");
            }
            other => panic!("expected unknown audience, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_column_pair_fails_to_parse() {
        let json = MINIMAL.replace(", \"W 30+\": { \"price\": 120, \"rating\": 1.5 }", "");
        assert!(matches!(CampaignInput::from_json_str(&json), Err(SplitError::Json(_))));
    }

    #[test]
    fn test_duplicate_rate_table_is_rejected() {
        let mut file: CampaignFile = serde_json::from_str(MINIMAL).unwrap();
        let copy = file.rate_tables[0].clone();
        file.rate_tables.push(copy);
        assert!(matches!(
            CampaignInput::from_file(file),
            Err(ConfigurationError::DuplicateSalesHouse { table: "rate", .. })
        ));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let campaign = CampaignInput::from_json_str(MINIMAL)
            .unwrap()
            .with_total_budget(2000.0)
            .with_optimization_goal(OptimizationGoal::Trp)
            .with_buying_audience_for_all(BuyingAudience::Women30Plus);

        assert_eq!(campaign.total_budget, 2000.0);
        assert_eq!(campaign.buying_audiences.get("Solo"), Some(BuyingAudience::Women30Plus));

        let allocation = campaign.run().unwrap();
        assert_eq!(allocation.optimization_goal, OptimizationGoal::Trp);
        assert_eq!(allocation.channel("A").unwrap().price, 120.0);
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campaign.json");
        std::fs::write(&path, MINIMAL).unwrap();
        let campaign = CampaignInput::from_path(&path).unwrap();
        assert_eq!(campaign.rate_tables.len(), 1);

        assert!(matches!(
            CampaignInput::from_path(&dir.path().join("missing.json")),
            Err(SplitError::Io(_))
        ));
    }
}
