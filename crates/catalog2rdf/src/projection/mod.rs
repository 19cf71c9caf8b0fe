//! Projection of relational records to DCAT documents.
//!
//! [`DatasetProjector`] is used on every create/update; [`CatalogProjector`]
//! only by the bulk migration, which is the sole writer of catalog metadata.

pub mod catalog;
pub mod dataset;

pub use catalog::CatalogProjector;
pub use dataset::DatasetProjector;

use crate::config::{SyncConfig, ThemeMode};

/// A dataset rendered as a standalone Turtle document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedDataset {
    pub identifier: String,
    /// Dataset IRI; also the name of the graph the document is stored in.
    pub dataset_iri: String,
    pub turtle: String,
    pub triple_count: usize,
}

/// Options controlling the shape of projected documents.
#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    pub base_uri: String,
    pub theme_mode: ThemeMode,
    pub contact_nodes: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for ProjectionOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            base_uri: config.base_uri.clone(),
            theme_mode: config.theme_mode,
            contact_nodes: config.contact_nodes,
        }
    }
}
