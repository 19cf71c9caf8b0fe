//! Relational records read for the bulk migration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::model::record::{CatalogRecord, DatasetRecord};

/// Read access to every catalog and dataset row.
pub trait RecordSource {
    fn catalogs(&self) -> Result<Vec<CatalogRecord>, LoadError>;
    fn datasets(&self) -> Result<Vec<DatasetRecord>, LoadError>;
}

/// A JSON export of the relational tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    #[serde(default)]
    pub catalogs: Vec<CatalogRecord>,
    #[serde(default)]
    pub datasets: Vec<DatasetRecord>,
}

impl Snapshot {
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl RecordSource for Snapshot {
    fn catalogs(&self) -> Result<Vec<CatalogRecord>, LoadError> {
        Ok(self.catalogs.clone())
    }

    fn datasets(&self) -> Result<Vec<DatasetRecord>, LoadError> {
        Ok(self.datasets.clone())
    }
}

/// Load a snapshot file from disk.
pub fn load_json(path: &Path) -> Result<Snapshot, LoadError> {
    let content = std::fs::read_to_string(path)?;
    Snapshot::from_json_str(&content)
}

/// Load a single dataset record (as sent with a create or update).
pub fn load_record(path: &Path) -> Result<DatasetRecord, LoadError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
