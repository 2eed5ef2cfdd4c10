use crate::campaign::CampaignInput;
use crate::error::{Result, SplitError};

/// Function type for dataset loaders
pub type DatasetFn = fn() -> Result<CampaignInput>;

/// Entry in the dataset catalog
#[derive(Clone)]
pub struct DatasetEntry {
    pub short_name: &'static str,
    pub description: &'static str,
    pub load: DatasetFn,
}

// Create an inventory collection for dataset entries
inventory::collect!(DatasetEntry);

/// Get all registered datasets from the catalog, sorted by name
pub fn get_dataset_catalog() -> Vec<DatasetEntry> {
    let mut entries: Vec<DatasetEntry> = inventory::iter::<DatasetEntry>
        .into_iter()
        .cloned()
        .collect();
    entries.sort_by_key(|entry| entry.short_name);
    entries
}

/// Load a dataset by its short name
pub fn load_dataset(short_name: &str) -> Result<CampaignInput> {
    let catalog = get_dataset_catalog();
    let entry = catalog
        .iter()
        .find(|entry| entry.short_name == short_name)
        .ok_or_else(|| SplitError::UnknownDataset(short_name.to_string()))?;
    (entry.load)()
}

// Dataset modules
pub mod sirius_space;
