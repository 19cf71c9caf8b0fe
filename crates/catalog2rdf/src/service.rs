//! Entry points used by the HTTP layer around dataset writes.
//!
//! Create and update run `project_and_validate` before the relational
//! commit and `on_created`/`on_updated` after it; delete only runs
//! `on_deleted`. Input errors surface as [`CoreError`]; store failures only
//! ever show up in the returned [`SyncReport`].

use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::{CoreError, MigrationError, StoreError};
use crate::migration::{BulkMigration, MigrationReport, RecordSource};
use crate::model::record::DatasetRecord;
use crate::projection::{DatasetProjector, ProjectedDataset, ProjectionOptions};
use crate::store::GraphStore;
use crate::sync::{DatasetSync, DriftJournal, SyncReport};
use crate::validation::{ConformanceValidator, ValidationReport};

pub struct CatalogService<S> {
    config: SyncConfig,
    projector: DatasetProjector,
    validator: ConformanceValidator,
    sync: DatasetSync<S>,
}

impl<S: GraphStore> CatalogService<S> {
    /// Load the shape graph (configured path or bundled) and wire the store.
    pub fn new(config: SyncConfig, store: S) -> Result<Self, CoreError> {
        let validator = match &config.shapes_path {
            Some(path) => ConformanceValidator::from_path(path)?,
            None => ConformanceValidator::bundled()?,
        };
        let projector = DatasetProjector::new(&ProjectionOptions::from(&config));
        let mut sync = DatasetSync::new(store, projector.iris().clone());
        if let Some(path) = &config.journal_path {
            sync = sync.with_journal(DriftJournal::new(path));
        }
        Ok(Self {
            config,
            projector,
            validator,
            sync,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.sync.store()
    }

    pub fn validator(&self) -> &ConformanceValidator {
        &self.validator
    }

    pub fn project(&self, record: &DatasetRecord) -> Result<ProjectedDataset, CoreError> {
        Ok(self.projector.project(record)?)
    }

    pub fn validate(&self, turtle: &str) -> Result<ValidationReport, CoreError> {
        Ok(self.validator.validate_turtle(turtle)?)
    }

    /// Project and reject the record unless the document conforms.
    pub fn project_and_validate(&self, record: &DatasetRecord) -> Result<ProjectedDataset, CoreError> {
        let doc = self.project(record)?;
        self.validator.check_turtle(&doc.turtle)?;
        Ok(doc)
    }

    pub async fn publish(&self, turtle: &str, graph_iri: &str) -> Result<(), StoreError> {
        self.store().publish(graph_iri, turtle).await
    }

    pub async fn retract(&self, graph_iri: &str) -> Result<(), StoreError> {
        self.store().retract(graph_iri).await
    }

    pub async fn add_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        self.store().add_membership(dataset_iri).await
    }

    pub async fn remove_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        self.store().remove_membership(dataset_iri).await
    }

    pub async fn on_created(&self, doc: &ProjectedDataset) -> SyncReport {
        self.sync.created(doc).await
    }

    pub async fn on_updated(&self, previous_identifier: &str, doc: &ProjectedDataset) -> SyncReport {
        self.sync.updated(previous_identifier, doc).await
    }

    pub async fn on_deleted(&self, identifier: &str) -> SyncReport {
        self.sync.deleted(identifier).await
    }

    /// Rebuild the store from `source`. A clean run also clears the drift
    /// journal, since everything it recorded has been repaired.
    pub async fn run_bulk_migration(
        &self,
        source: &dyn RecordSource,
    ) -> Result<MigrationReport, MigrationError> {
        let report = BulkMigration::new(self.store(), &ProjectionOptions::from(&self.config))
            .with_concurrency(self.config.upload_concurrency)
            .run(source)
            .await?;

        if let (true, Some(journal)) = (report.is_clean(), self.sync.journal()) {
            match journal.clear() {
                Ok(()) => info!(path = %journal.path().display(), "drift journal cleared"),
                Err(e) => warn!(path = %journal.path().display(), error = %e, "could not clear drift journal"),
            }
        }
        Ok(report)
    }
}
