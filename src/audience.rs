use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Demographic segment a sales house is bought against.
/// Each variant selects one price/rating column pair of a rate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuyingAudience {
    #[serde(rename = "All 18-60")]
    All18To60,
    #[serde(rename = "W 30+")]
    Women30Plus,
}

impl BuyingAudience {
    pub const ALL: [BuyingAudience; 2] = [BuyingAudience::All18To60, BuyingAudience::Women30Plus];

    /// Label used in rate tables and campaign files
    pub fn label(&self) -> &'static str {
        match self {
            BuyingAudience::All18To60 => "All 18-60",
            BuyingAudience::Women30Plus => "W 30+",
        }
    }
}

impl fmt::Display for BuyingAudience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BuyingAudience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        BuyingAudience::ALL
            .iter()
            .copied()
            .find(|audience| audience.label() == trimmed)
            .ok_or_else(|| format!("unknown buying audience '{}'", s))
    }
}

/// Price of one slot and the rating it delivers for a single buying audience
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudienceRate {
    pub price: f64,
    pub rating: f64,
}

/// One price/rating pair per supported buying audience
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudienceRates {
    #[serde(rename = "All 18-60")]
    pub all_18_60: AudienceRate,
    #[serde(rename = "W 30+")]
    pub women_30_plus: AudienceRate,
}

impl AudienceRates {
    pub fn for_audience(&self, audience: BuyingAudience) -> AudienceRate {
        match audience {
            BuyingAudience::All18To60 => self.all_18_60,
            BuyingAudience::Women30Plus => self.women_30_plus,
        }
    }

    #[cfg(test)]
    pub fn for_audience_mut(&mut self, audience: BuyingAudience) -> &mut AudienceRate {
        match audience {
            BuyingAudience::All18To60 => &mut self.all_18_60,
            BuyingAudience::Women30Plus => &mut self.women_30_plus,
        }
    }
}

/// Sales house name -> buying audience used to price that sales house
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuyingAudienceMap {
    audiences: HashMap<String, BuyingAudience>,
}

impl BuyingAudienceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from raw labels as found in a campaign file.
    /// Any label that does not name a known audience is a configuration error.
    pub fn from_labels<'a, I>(labels: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut map = Self::new();
        for (sales_house, label) in labels {
            let audience = label.parse::<BuyingAudience>().map_err(|_| ConfigurationError::UnknownBuyingAudience {
                sales_house: sales_house.clone(),
                audience: label.clone(),
            })?;
            map.set(sales_house.clone(), audience);
        }
        Ok(map)
    }

    pub fn set(&mut self, sales_house: impl Into<String>, audience: BuyingAudience) {
        self.audiences.insert(sales_house.into(), audience);
    }

    #[cfg(test)]
    pub fn remove(&mut self, sales_house: &str) -> Option<BuyingAudience> {
        self.audiences.remove(sales_house)
    }

    pub fn get(&self, sales_house: &str) -> Option<BuyingAudience> {
        self.audiences.get(sales_house).copied()
    }

    /// Look up the audience of a sales house, failing when none is configured
    pub fn resolve(&self, sales_house: &str) -> Result<BuyingAudience, ConfigurationError> {
        self.get(sales_house)
            .ok_or_else(|| ConfigurationError::MissingBuyingAudience(sales_house.to_string()))
    }
}

/// What the campaign is said to optimize for.
/// Only used to label the comparison chart; the allocation is the same for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum OptimizationGoal {
    #[default]
    #[serde(rename = "Aff", alias = "aff", alias = "AFF")]
    Aff,
    #[serde(rename = "TRP", alias = "trp", alias = "Trp")]
    Trp,
}

impl fmt::Display for OptimizationGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationGoal::Aff => f.write_str("Aff"),
            OptimizationGoal::Trp => f.write_str("TRP"),
        }
    }
}
