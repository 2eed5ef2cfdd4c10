use thiserror::Error;

/// Problems with the campaign definition itself, detected before any allocation runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("no buying audience configured for sales house '{0}'")]
    MissingBuyingAudience(String),

    #[error("unknown buying audience '{audience}' for sales house '{sales_house}' (expected \"All 18-60\" or \"W 30+\")")]
    UnknownBuyingAudience { sales_house: String, audience: String },

    #[error("sales house '{sales_house}' has more than one {table} table")]
    DuplicateSalesHouse { sales_house: String, table: &'static str },

    #[error("channel '{channel}' appears more than once in the {table} table of sales house '{sales_house}'")]
    DuplicateChannel { sales_house: String, channel: String, table: &'static str },

    #[error("channel '{channel}' is tagged with sales house '{row_sales_house}' but listed under '{sales_house}'")]
    SalesHouseMismatch { sales_house: String, channel: String, row_sales_house: String },

    #[error("invalid {field} {value} for channel '{channel}' of sales house '{sales_house}'")]
    InvalidValue { sales_house: String, channel: String, field: &'static str, value: f64 },

    #[error("total budget must be positive and finite, got {0}")]
    InvalidBudget(f64),
}

/// Inputs that are well-formed but leave nothing meaningful to split
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DegenerateInputError {
    #[error("no channel matched between rate and affinity tables")]
    NoChannels,

    #[error("baseline budget sums to zero across all channels")]
    ZeroBaselineBudget,

    #[error("baseline budget of sales house '{0}' sums to zero (all prices or ratings are zero)")]
    ZeroSalesHouseBaseline(String),

    #[error("allocated budget is zero after rounding slots")]
    ZeroAllocatedBudget,

    #[error("channel '{channel}' of sales house '{sales_house}' would need {slots:e} slots, more than can be counted")]
    SlotCountOutOfRange { sales_house: String, channel: String, slots: f64 },

    #[error("total slot count of {scope} exceeds the countable range")]
    SlotTotalOverflow { scope: String },
}

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("degenerate input: {0}")]
    DegenerateInput(#[from] DegenerateInputError),

    #[error("dataset '{0}' not found")]
    UnknownDataset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("campaign file parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("chart rendering failed: {0}")]
    Chart(String),
}

pub type Result<T> = std::result::Result<T, SplitError>;
