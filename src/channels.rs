use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::audience::{AudienceRates, BuyingAudience};
use crate::error::ConfigurationError;

/// Price and rating of one channel of a sales house, for every buying audience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRateRow {
    pub channel: String,
    /// Optional in campaign files; filled from the owning table when loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_house: Option<String>,
    pub rates: AudienceRates,
}

/// Affinity score a planner assigned to a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityRow {
    pub channel: String,
    pub affinity: f64,
}

/// All rate rows of a single sales house, in the order they were supplied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub sales_house: String,
    pub rows: Vec<ChannelRateRow>,
}

/// All affinity rows of a single sales house
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityTable {
    pub sales_house: String,
    pub rows: Vec<AffinityRow>,
}

fn check_non_negative(sales_house: &str, channel: &str, field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidValue {
            sales_house: sales_house.to_string(),
            channel: channel.to_string(),
            field,
            value,
        })
    }
}

impl RateTable {
    #[cfg(test)]
    pub fn new(sales_house: impl Into<String>) -> Self {
        Self {
            sales_house: sales_house.into(),
            rows: Vec::new(),
        }
    }

    /// Append a row, tagging it with this table's sales house
    #[cfg(test)]
    pub fn push(&mut self, channel: impl Into<String>, rates: AudienceRates) {
        self.rows.push(ChannelRateRow {
            channel: channel.into(),
            sales_house: Some(self.sales_house.clone()),
            rates,
        });
    }

    /// Check the table is internally consistent and tag every row with the sales house.
    ///
    /// Rejects duplicate channels, rows tagged with another sales house, and
    /// negative or non-finite prices and ratings for any audience.
    pub fn normalize(&mut self) -> Result<(), ConfigurationError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.rows.len());
        for row in &self.rows {
            if !seen.insert(row.channel.as_str()) {
                return Err(ConfigurationError::DuplicateChannel {
                    sales_house: self.sales_house.clone(),
                    channel: row.channel.clone(),
                    table: "rate",
                });
            }
            if let Some(row_sales_house) = &row.sales_house {
                if *row_sales_house != self.sales_house {
                    return Err(ConfigurationError::SalesHouseMismatch {
                        sales_house: self.sales_house.clone(),
                        channel: row.channel.clone(),
                        row_sales_house: row_sales_house.clone(),
                    });
                }
            }
            for audience in BuyingAudience::ALL {
                let rate = row.rates.for_audience(audience);
                check_non_negative(&self.sales_house, &row.channel, "price", rate.price)?;
                check_non_negative(&self.sales_house, &row.channel, "rating", rate.rating)?;
            }
        }

        for row in &mut self.rows {
            if row.sales_house.is_none() {
                row.sales_house = Some(self.sales_house.clone());
            }
        }
        Ok(())
    }
}

impl AffinityTable {
    #[cfg(test)]
    pub fn new(sales_house: impl Into<String>) -> Self {
        Self {
            sales_house: sales_house.into(),
            rows: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn push(&mut self, channel: impl Into<String>, affinity: f64) {
        self.rows.push(AffinityRow {
            channel: channel.into(),
            affinity,
        });
    }

    /// Affinity has no fixed range, but it has to be a number
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for row in &self.rows {
            if !row.affinity.is_finite() {
                return Err(ConfigurationError::InvalidValue {
                    sales_house: self.sales_house.clone(),
                    channel: row.channel.clone(),
                    field: "affinity",
                    value: row.affinity,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audience::AudienceRate;

    fn rates(price: f64, rating: f64) -> AudienceRates {
        AudienceRates {
            all_18_60: AudienceRate { price, rating },
            women_30_plus: AudienceRate { price, rating },
        }
    }

    #[test]
    fn test_normalize_fills_missing_sales_house() {
        let mut table = RateTable {
            sales_house: "Space".to_string(),
            rows: vec![ChannelRateRow {
                channel: "УНІАН".to_string(),
                sales_house: None,
                rates: rates(3500.0, 4.0),
            }],
        };
        table.normalize().unwrap();
        assert_eq!(table.rows[0].sales_house.as_deref(), Some("Space"));
    }

    #[test]
    fn test_normalize_rejects_duplicate_channel() {
        let mut table = RateTable::new("Sirius");
        table.push("ICTV", rates(18000.0, 25.0));
        table.push("ICTV", rates(12500.0, 16.0));
        assert!(matches!(
            table.normalize(),
            Err(ConfigurationError::DuplicateChannel { ref channel, table: "rate", .. }) if channel == "ICTV"
        ));
    }

    #[test]
    fn test_normalize_rejects_foreign_row() {
        let mut table = RateTable::new("Sirius");
        table.rows.push(ChannelRateRow {
            channel: "БІГУДІ".to_string(),
            sales_house: Some("Space".to_string()),
            rates: rates(5000.0, 6.0),
        });
        assert!(matches!(table.normalize(), Err(ConfigurationError::SalesHouseMismatch { .. })));
    }

    #[test]
    fn test_normalize_rejects_negative_price() {
        let mut table = RateTable::new("Sirius");
        table.push("ОЦЕ", rates(-7000.0, 8.0));
        assert!(matches!(
            table.normalize(),
            Err(ConfigurationError::InvalidValue { field: "price", .. })
        ));
    }

    #[test]
    fn test_affinity_must_be_finite() {
        let mut table = AffinityTable::new("Sirius");
        table.push("ICTV", 95.0);
        assert!(table.validate().is_ok());
        table.push("СТБ", f64::NAN);
        assert!(matches!(
            table.validate(),
            Err(ConfigurationError::InvalidValue { field: "affinity", .. })
        ));
    }
}
