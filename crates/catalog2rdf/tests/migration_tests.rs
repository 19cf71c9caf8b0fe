//! Bulk migration from a relational snapshot into the in-memory store.

use std::path::PathBuf;

use async_trait::async_trait;
use catalog2rdf::error::{LoadError, MigrationError};
use catalog2rdf::migration::{load_json, BulkMigration, RecordSource, Snapshot};
use catalog2rdf::model::iri::IriMinter;
use catalog2rdf::model::record::{CatalogRecord, DatasetRecord};
use catalog2rdf::model::vocab::{dcat, dct};
use catalog2rdf::projection::ProjectionOptions;
use catalog2rdf::store::{GraphStore, MemoryGraphStore};
use catalog2rdf::StoreError;
use oxrdf::vocab::rdf;
use oxrdf::{NamedNodeRef, TripleRef};

const BASE: &str = "https://semantic-data-catalog.com";

fn snapshot() -> Snapshot {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("snapshot.json");
    load_json(&path).expect("fixture snapshot")
}

fn options() -> ProjectionOptions {
    ProjectionOptions {
        base_uri: BASE.to_string(),
        ..Default::default()
    }
}

fn store() -> MemoryGraphStore {
    MemoryGraphStore::new(IriMinter::new(BASE).catalog_iri())
}

fn iri(identifier: &str) -> String {
    IriMinter::new(BASE).dataset_iri(identifier)
}

/// Store wrapper that rejects uploads of one graph and optionally the
/// dataset provisioning or the wipe.
struct RejectingStore {
    inner: MemoryGraphStore,
    reject_graph: Option<String>,
    reject_provision: bool,
    reject_wipe: bool,
}

impl RejectingStore {
    fn new() -> Self {
        Self {
            inner: store(),
            reject_graph: None,
            reject_provision: false,
            reject_wipe: false,
        }
    }
}

#[async_trait]
impl GraphStore for RejectingStore {
    async fn publish(&self, graph_iri: &str, turtle: &str) -> Result<(), StoreError> {
        if self.reject_graph.as_deref() == Some(graph_iri) {
            return Err(StoreError::Timeout {
                url: graph_iri.to_string(),
            });
        }
        self.inner.publish(graph_iri, turtle).await
    }

    async fn retract(&self, graph_iri: &str) -> Result<(), StoreError> {
        self.inner.retract(graph_iri).await
    }

    async fn add_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        self.inner.add_membership(dataset_iri).await
    }

    async fn remove_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        self.inner.remove_membership(dataset_iri).await
    }

    async fn ensure_dataset(&self) -> Result<(), StoreError> {
        if self.reject_provision {
            return Err(StoreError::Status {
                operation: "create dataset".to_string(),
                status: 403,
                body: String::new(),
            });
        }
        self.inner.ensure_dataset().await
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        if self.reject_wipe {
            return Err(StoreError::Status {
                operation: "wipe".to_string(),
                status: 500,
                body: String::new(),
            });
        }
        self.inner.wipe().await
    }
}

/// A source whose dataset table cannot be read.
struct BrokenSource;

impl RecordSource for BrokenSource {
    fn catalogs(&self) -> Result<Vec<CatalogRecord>, LoadError> {
        Ok(Vec::new())
    }

    fn datasets(&self) -> Result<Vec<DatasetRecord>, LoadError> {
        Err(LoadError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "database unavailable",
        )))
    }
}

// ---------------------------------------------------------------------------
// Snapshot fixture
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_is_rebuilt() {
    let store = store();
    let report = BulkMigration::new(&store, &options())
        .run(&snapshot())
        .await
        .unwrap();

    assert_eq!(report.catalogs, 1);
    assert_eq!(report.datasets_published, 3);
    assert_eq!(report.orphans, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].identifier, "dataset-4");
    assert!(report.skipped[0].reason.contains("title"), "{:?}", report.skipped);
    assert_eq!(report.embedded_failures.len(), 1);
    assert_eq!(report.embedded_failures[0].identifier, "dataset-2");
    assert!(!report.is_clean(), "a skipped row leaves the store incomplete");

    let catalog = IriMinter::new(BASE).catalog_iri();
    let mut expected = vec![
        catalog.clone(),
        iri("dataset-1"),
        iri("dataset-2"),
        iri("dataset-3"),
    ];
    expected.sort();
    assert_eq!(store.graph_names().await, expected);
    assert_eq!(
        store.members().await.len(),
        3,
        "orphans are listed as members too"
    );
}

#[tokio::test]
async fn catalog_graph_describes_the_catalog() {
    let store = store();
    BulkMigration::new(&store, &options())
        .run(&snapshot())
        .await
        .unwrap();

    let catalog_iri = IriMinter::new(BASE).catalog_iri();
    let graph = store.graph(&catalog_iri).await.unwrap();
    let catalog = NamedNodeRef::new(&catalog_iri).unwrap();
    assert!(graph.contains(TripleRef::new(catalog, rdf::TYPE, dcat::CATALOG)));
    assert!(graph.object_for_subject_predicate(catalog, dct::TITLE).is_some());
    assert!(graph.object_for_subject_predicate(catalog, dct::PUBLISHER).is_some());
}

#[tokio::test]
async fn embedded_rdf_is_merged_into_the_dataset_graph() {
    let store = store();
    BulkMigration::new(&store, &options())
        .run(&snapshot())
        .await
        .unwrap();

    let graph = store.graph(&iri("dataset-1")).await.unwrap();
    let label = NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label");
    let model = NamedNodeRef::new_unchecked("http://example.org/models/sensor");
    assert!(graph.object_for_subject_predicate(model, label).is_some());

    // Unparsable embedded RDF is dropped, the dataset itself is kept.
    let graph = store.graph(&iri("dataset-2")).await.unwrap();
    let ds = NamedNodeRef::new(iri("dataset-2").as_str()).unwrap().into_owned();
    assert!(graph.contains(TripleRef::new(ds.as_ref(), rdf::TYPE, dcat::DATASET)));
}

// ---------------------------------------------------------------------------
// Repair properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn migration_is_idempotent() {
    let store = store();
    let migration = BulkMigration::new(&store, &options());
    let first = migration.run(&snapshot()).await.unwrap();
    let names = store.graph_names().await;
    let graph = store.graph(&iri("dataset-1")).await;

    let second = migration.run(&snapshot()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.graph_names().await, names);
    assert_eq!(store.graph(&iri("dataset-1")).await, graph);
}

#[tokio::test]
async fn stale_graphs_are_removed() {
    let store = store();
    store
        .publish(
            &iri("deleted-long-ago"),
            "<https://example.org/s> <https://example.org/p> \"o\" .",
        )
        .await
        .unwrap();
    store.add_membership(&iri("deleted-long-ago")).await.unwrap();

    BulkMigration::new(&store, &options())
        .run(&snapshot())
        .await
        .unwrap();

    assert!(store.graph(&iri("deleted-long-ago")).await.is_none());
    assert!(!store.is_member(&iri("deleted-long-ago")).await);
}

#[tokio::test]
async fn concurrent_uploads_give_the_same_store() {
    let sequential = store();
    BulkMigration::new(&sequential, &options())
        .run(&snapshot())
        .await
        .unwrap();

    let concurrent = store();
    BulkMigration::new(&concurrent, &options())
        .with_concurrency(4)
        .run(&snapshot())
        .await
        .unwrap();

    assert_eq!(sequential.graph_names().await, concurrent.graph_names().await);
    assert_eq!(sequential.members().await.len(), concurrent.members().await.len());
}

#[tokio::test]
async fn row_without_access_url_is_published_without_distribution() {
    let snapshot = Snapshot {
        catalogs: Vec::new(),
        datasets: vec![DatasetRecord {
            access_url_dataset: String::new(),
            ..snapshot().datasets[2].clone()
        }],
    };
    let identifier = snapshot.datasets[0].identifier.clone();

    let store = store();
    let report = BulkMigration::new(&store, &options())
        .run(&snapshot)
        .await
        .unwrap();
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert_eq!(report.datasets_published, 1);
    assert!(report.is_clean());

    let graph = store.graph(&iri(&identifier)).await.unwrap();
    let ds = NamedNodeRef::new(iri(&identifier).as_str()).unwrap().into_owned();
    assert!(graph.contains(TripleRef::new(ds.as_ref(), rdf::TYPE, dcat::DATASET)));
    assert!(graph
        .object_for_subject_predicate(ds.as_ref(), dcat::DISTRIBUTION_PROP)
        .is_none());
    assert!(store.is_member(&iri(&identifier)).await);
}

#[tokio::test]
async fn rejected_row_does_not_shadow_a_later_row() {
    let valid = snapshot().datasets[0].clone();
    let broken = DatasetRecord {
        access_url_dataset: "not a url".to_string(),
        ..valid.clone()
    };
    let snapshot = Snapshot {
        catalogs: Vec::new(),
        datasets: vec![broken, valid],
    };

    let store = store();
    let report = BulkMigration::new(&store, &options())
        .run(&snapshot)
        .await
        .unwrap();
    assert_eq!(report.datasets_published, 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(
        report.skipped[0].reason.contains("access_url_dataset"),
        "{:?}",
        report.skipped
    );
    assert!(store.graph(&iri("dataset-1")).await.is_some());
}

#[tokio::test]
async fn duplicate_identifiers_are_published_once() {
    let mut snapshot = snapshot();
    let first = snapshot.datasets[0].clone();
    snapshot.datasets.push(first);

    let store = store();
    let report = BulkMigration::new(&store, &options())
        .run(&snapshot)
        .await
        .unwrap();
    assert_eq!(report.datasets_published, 3);
    assert!(report
        .skipped
        .iter()
        .any(|s| s.identifier == "dataset-1" && s.reason.contains("duplicate")));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_upload_is_reported_and_not_listed() {
    let store = RejectingStore {
        reject_graph: Some(iri("dataset-3")),
        ..RejectingStore::new()
    };
    let report = BulkMigration::new(&store, &options())
        .run(&snapshot())
        .await
        .unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.datasets_published, 2);
    assert_eq!(report.upload_failures.len(), 1);
    assert_eq!(report.upload_failures[0].graph_iri, iri("dataset-3"));
    assert!(!store.inner.is_member(&iri("dataset-3")).await);
    assert!(store.inner.is_member(&iri("dataset-1")).await);
}

#[tokio::test]
async fn failed_wipe_aborts_the_migration() {
    let store = RejectingStore {
        reject_wipe: true,
        ..RejectingStore::new()
    };
    store
        .inner
        .publish(&iri("kept"), "<https://example.org/s> <https://example.org/p> 1 .")
        .await
        .unwrap();

    let err = BulkMigration::new(&store, &options())
        .run(&snapshot())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Wipe(_)), "{err:?}");
    assert_eq!(store.inner.graph_names().await, [iri("kept")]);
}

#[tokio::test]
async fn failed_provisioning_aborts_before_the_wipe() {
    let store = RejectingStore {
        reject_provision: true,
        ..RejectingStore::new()
    };
    store
        .inner
        .publish(&iri("kept"), "<https://example.org/s> <https://example.org/p> 1 .")
        .await
        .unwrap();

    let err = BulkMigration::new(&store, &options())
        .run(&snapshot())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Provision(_)), "{err:?}");
    assert_eq!(store.inner.graph_names().await, [iri("kept")]);
}

#[tokio::test]
async fn unreadable_source_leaves_the_store_untouched() {
    let store = store();
    store
        .publish(&iri("kept"), "<https://example.org/s> <https://example.org/p> 1 .")
        .await
        .unwrap();

    let err = BulkMigration::new(&store, &options())
        .run(&BrokenSource)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Source(_)), "{err:?}");
    assert_eq!(store.graph_names().await, [iri("kept")]);
}

#[tokio::test]
async fn empty_snapshot_clears_the_store() {
    let store = store();
    store
        .publish(&iri("kept"), "<https://example.org/s> <https://example.org/p> 1 .")
        .await
        .unwrap();

    let report = BulkMigration::new(&store, &options())
        .run(&Snapshot::default())
        .await
        .unwrap();
    assert!(report.is_clean());
    assert!(store.graph_names().await.is_empty());
}
