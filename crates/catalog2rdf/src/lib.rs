//! Project dataset catalog records to DCAT RDF and keep a triple store in
//! sync with the relational source of truth.
//!
//! The write path is `project` -> `validate` -> (relational commit by the
//! caller) -> `sync`. The bulk migration rebuilds every graph from the
//! relational snapshot and is the only repair path for drift left behind by
//! failed synchronization steps.

pub mod config;
pub mod emitter;
pub mod error;
pub mod migration;
pub mod model;
pub mod projection;
pub mod service;
pub mod store;
pub mod sync;
pub mod validation;

pub use config::{StoreConfig, SyncConfig, ThemeMode};
pub use error::{CoreError, StoreError, ValidationError, ValueError};
pub use projection::ProjectedDataset;
pub use service::CatalogService;
