//! Process-wide configuration for projection and triple store access.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base URI used when none is configured.
pub const DEFAULT_BASE_URI: &str = "https://semantic-data-catalog.com";

/// Graph store protocol endpoint of the default Fuseki deployment.
pub const DEFAULT_DATA_URL: &str = "http://fuseki:3030/semantic_data_catalog/data";

/// SPARQL update endpoint of the default Fuseki deployment.
pub const DEFAULT_UPDATE_URL: &str = "http://fuseki:3030/semantic_data_catalog/update";

/// Per-request timeout applied to every remote call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How `dcat:theme` values are emitted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Free text, emitted as a plain literal.
    #[default]
    Literal,
    /// Must be an http(s) IRI, emitted as a resource.
    Iri,
}

/// Connection settings for the remote triple store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_url: String,
    pub update_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_url: DEFAULT_DATA_URL.to_string(),
            update_url: DEFAULT_UPDATE_URL.to_string(),
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Everything the core needs to project, validate and synchronize.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_uri: String,
    pub theme_mode: ThemeMode,
    /// Emit a `vcard:Kind` contact node per dataset.
    pub contact_nodes: bool,
    pub store: StoreConfig,
    /// Shape graph location; the bundled shapes are used when unset.
    pub shapes_path: Option<PathBuf>,
    /// Append-only record of synchronization failures.
    pub journal_path: Option<PathBuf>,
    /// Number of dataset graphs uploaded concurrently by the bulk migration.
    pub upload_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            theme_mode: ThemeMode::default(),
            contact_nodes: true,
            store: StoreConfig::default(),
            shapes_path: None,
            journal_path: None,
            upload_concurrency: 1,
        }
    }
}
