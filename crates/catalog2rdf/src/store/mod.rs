//! Triple store access.
//!
//! Each dataset lives in its own named graph (named after the dataset IRI).
//! Catalog membership is a single `dcat:dataset` triple per dataset in the
//! catalog graph. Every operation is idempotent so the bulk migration and
//! retries can replay it freely.

pub mod http;
pub mod memory;
pub mod sparql;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;

pub use http::HttpGraphStore;
pub use memory::MemoryGraphStore;

/// Operations the synchronization layer needs from a triple store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Replace the content of `graph_iri` with the given Turtle document.
    async fn publish(&self, graph_iri: &str, turtle: &str) -> Result<(), StoreError>;

    /// Drop `graph_iri`. Dropping an absent graph succeeds.
    async fn retract(&self, graph_iri: &str) -> Result<(), StoreError>;

    async fn add_membership(&self, dataset_iri: &str) -> Result<(), StoreError>;

    async fn remove_membership(&self, dataset_iri: &str) -> Result<(), StoreError>;

    /// Delete everything: every named graph and the default graph.
    async fn wipe(&self) -> Result<(), StoreError>;

    /// Make sure the dataset the graphs live in exists, creating it when
    /// the store supports that. Run before a bulk migration.
    async fn ensure_dataset(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl<T: GraphStore + ?Sized> GraphStore for Arc<T> {
    async fn publish(&self, graph_iri: &str, turtle: &str) -> Result<(), StoreError> {
        (**self).publish(graph_iri, turtle).await
    }

    async fn retract(&self, graph_iri: &str) -> Result<(), StoreError> {
        (**self).retract(graph_iri).await
    }

    async fn add_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        (**self).add_membership(dataset_iri).await
    }

    async fn remove_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        (**self).remove_membership(dataset_iri).await
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        (**self).wipe().await
    }

    async fn ensure_dataset(&self) -> Result<(), StoreError> {
        (**self).ensure_dataset().await
    }
}

/// Reject graph or dataset IRIs that would corrupt a request.
pub(crate) fn check_iri(iri: &str) -> Result<(), StoreError> {
    oxiri::Iri::parse(iri)
        .map(|_| ())
        .map_err(|e| StoreError::InvalidIri(format!("{iri}: {e}")))
}
