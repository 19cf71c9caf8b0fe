//! Full rebuild of the triple store from the relational records.
//!
//! The store is wiped first, so running the migration twice over the same
//! records yields the same graphs. This is the repair path for every kind of
//! drift the write path can leave behind.
//!
//! Rows are projected without validation. A row without an access URL is
//! published without a distribution.

pub mod snapshot;

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use oxrdf::NamedNode;
use tracing::{info, warn};

use crate::emitter::ntriples::parse_supplementary;
use crate::emitter::{turtle, GraphBuilder};
use crate::error::MigrationError;
use crate::model::record::{present, DatasetRecord};
use crate::projection::{CatalogProjector, DatasetProjector, ProjectionOptions};
use crate::store::GraphStore;

pub use snapshot::{load_json, RecordSource, Snapshot};

/// A dataset left out of the rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDataset {
    pub identifier: String,
    pub reason: String,
}

/// Embedded RDF that could not be parsed. The dataset itself was still
/// published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedRdfFailure {
    pub identifier: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub graph_iri: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub catalogs: usize,
    /// Dataset graphs uploaded successfully.
    pub datasets_published: usize,
    /// Datasets without a known catalog (still published and listed).
    pub orphans: usize,
    pub skipped: Vec<SkippedDataset>,
    pub embedded_failures: Vec<EmbeddedRdfFailure>,
    pub upload_failures: Vec<UploadFailure>,
    pub catalog_published: bool,
}

impl MigrationReport {
    /// Every live dataset row ended up with a graph and every upload
    /// succeeded. Unparsable embedded RDF does not count.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.upload_failures.is_empty() && self.catalog_published
    }
}

/// A dataset graph ready for upload.
struct PendingGraph {
    iri: NamedNode,
    turtle: String,
}

pub struct BulkMigration<'s, S> {
    store: &'s S,
    projector: DatasetProjector,
    catalogs: CatalogProjector,
    concurrency: usize,
}

impl<'s, S: GraphStore> BulkMigration<'s, S> {
    pub fn new(store: &'s S, options: &ProjectionOptions) -> Self {
        Self {
            store,
            projector: DatasetProjector::new(options).allow_missing_access_url(),
            catalogs: CatalogProjector::new(&options.base_uri),
            concurrency: 1,
        }
    }

    /// Number of dataset graphs uploaded at once (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self, source: &dyn RecordSource) -> Result<MigrationReport, MigrationError> {
        let catalogs = source.catalogs()?;
        let datasets = source.datasets()?;
        info!(
            catalogs = catalogs.len(),
            datasets = datasets.len(),
            "starting bulk migration"
        );

        self.store
            .ensure_dataset()
            .await
            .map_err(MigrationError::Provision)?;
        self.store.wipe().await.map_err(MigrationError::Wipe)?;

        let mut report = MigrationReport {
            catalogs: catalogs.len(),
            ..Default::default()
        };
        let mut catalog_graph = GraphBuilder::new();
        for catalog in &catalogs {
            self.catalogs.emit_catalog(&mut catalog_graph, catalog);
        }

        let known: HashSet<&str> = catalogs.iter().map(|c| c.key.as_str()).collect();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for record in &datasets {
            let identifier = record.identifier.trim();
            if !identifier.is_empty() && seen.contains(identifier) {
                warn!(identifier = %record.identifier, "duplicate dataset identifier, skipping");
                report.skipped.push(SkippedDataset {
                    identifier: record.identifier.clone(),
                    reason: "duplicate identifier".to_string(),
                });
                continue;
            }
            match self.prepare(record, &mut report) {
                Ok(graph) => {
                    seen.insert(identifier);
                    if !present(&record.catalog).is_some_and(|key| known.contains(key)) {
                        report.orphans += 1;
                    }
                    pending.push(graph);
                }
                Err(reason) => {
                    warn!(identifier = %record.identifier, reason = %reason, "dataset skipped");
                    report.skipped.push(SkippedDataset {
                        identifier: record.identifier.clone(),
                        reason,
                    });
                }
            }
        }

        let store = self.store;
        let uploads: Vec<_> = stream::iter(pending)
            .map(|graph| async move {
                let result = store.publish(graph.iri.as_str(), &graph.turtle).await;
                (graph, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut published: Vec<NamedNode> = Vec::new();
        for (graph, result) in uploads {
            match result {
                Ok(()) => published.push(graph.iri),
                Err(e) => {
                    warn!(graph = %graph.iri, error = %e, "dataset graph upload failed");
                    report.upload_failures.push(UploadFailure {
                        graph_iri: graph.iri.as_str().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        published.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        for iri in &published {
            self.catalogs.emit_membership(&mut catalog_graph, iri);
        }
        report.datasets_published = published.len();

        report.catalog_published = self.publish_catalog(catalog_graph, &mut report).await;

        info!(
            published = report.datasets_published,
            skipped = report.skipped.len(),
            embedded_failures = report.embedded_failures.len(),
            upload_failures = report.upload_failures.len(),
            "bulk migration finished"
        );
        Ok(report)
    }

    /// Project one record and merge its embedded RDF.
    fn prepare(
        &self,
        record: &DatasetRecord,
        report: &mut MigrationReport,
    ) -> Result<PendingGraph, String> {
        let iri = self
            .projector
            .iris()
            .dataset_node(&record.identifier)
            .map_err(|e| e.to_string())?;
        let graph = self.projector.build_graph(record).map_err(|e| e.to_string())?;
        let mut builder = GraphBuilder::new();
        builder.merge(&graph);

        if let Some(text) = present(&record.semantic_model_file) {
            match parse_supplementary(text, record.semantic_model_file_name.as_deref()) {
                Ok(embedded) => builder.merge(&embedded),
                Err(e) => {
                    warn!(
                        identifier = %record.identifier,
                        error = %e,
                        "embedded RDF could not be parsed; publishing dataset without it"
                    );
                    report.embedded_failures.push(EmbeddedRdfFailure {
                        identifier: record.identifier.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let turtle = turtle::serialize_graph(builder.graph()).map_err(|e| e.to_string())?;
        Ok(PendingGraph { iri, turtle })
    }

    async fn publish_catalog(&self, catalog_graph: GraphBuilder, report: &mut MigrationReport) -> bool {
        let catalog_iri = self.catalogs.catalog_iri();
        if catalog_graph.triple_count() == 0 {
            return true;
        }
        let result = match turtle::serialize_graph(catalog_graph.graph()) {
            Ok(ttl) => self
                .store
                .publish(catalog_iri, &ttl)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(()) => true,
            Err(error) => {
                warn!(graph = %catalog_iri, error = %error, "catalog graph upload failed");
                report.upload_failures.push(UploadFailure {
                    graph_iri: catalog_iri.to_string(),
                    error,
                });
                false
            }
        }
    }
}
