//! In-process store used for dry runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use oxrdf::{Graph, NamedNodeRef, TripleRef};
use tokio::sync::Mutex;

use super::{check_iri, GraphStore};
use crate::emitter::turtle::parse_turtle;
use crate::error::StoreError;
use crate::model::vocab::dcat;

/// Named graphs held in memory, keyed by graph IRI.
///
/// Behaves like the remote store: publish replaces a graph, retracting an
/// absent graph succeeds, and graphs left empty disappear.
#[derive(Debug)]
pub struct MemoryGraphStore {
    catalog_iri: String,
    graphs: Mutex<BTreeMap<String, Graph>>,
}

impl MemoryGraphStore {
    pub fn new(catalog_iri: impl Into<String>) -> Self {
        Self {
            catalog_iri: catalog_iri.into(),
            graphs: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn catalog_iri(&self) -> &str {
        &self.catalog_iri
    }

    /// Copy of a named graph, if present.
    pub async fn graph(&self, graph_iri: &str) -> Option<Graph> {
        self.graphs.lock().await.get(graph_iri).cloned()
    }

    /// Names of all non-empty graphs, sorted.
    pub async fn graph_names(&self) -> Vec<String> {
        self.graphs.lock().await.keys().cloned().collect()
    }

    pub async fn is_member(&self, dataset_iri: &str) -> bool {
        self.members().await.iter().any(|m| m == dataset_iri)
    }

    /// Dataset IRIs listed in the catalog graph.
    pub async fn members(&self) -> Vec<String> {
        let graphs = self.graphs.lock().await;
        let Some(catalog) = graphs.get(&self.catalog_iri) else {
            return Vec::new();
        };
        catalog
            .triples_for_predicate(dcat::DATASET_PROP)
            .filter_map(|t| match t.object {
                oxrdf::TermRef::NamedNode(n) => Some(n.as_str().to_string()),
                _ => None,
            })
            .collect()
    }

    fn membership_triple<'a>(&'a self, dataset_iri: &'a str) -> Result<TripleRef<'a>, StoreError> {
        check_iri(dataset_iri)?;
        check_iri(&self.catalog_iri)?;
        Ok(TripleRef::new(
            NamedNodeRef::new_unchecked(&self.catalog_iri),
            dcat::DATASET_PROP,
            NamedNodeRef::new_unchecked(dataset_iri),
        ))
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn publish(&self, graph_iri: &str, turtle: &str) -> Result<(), StoreError> {
        check_iri(graph_iri)?;
        let graph = parse_turtle(turtle).map_err(|e| StoreError::Rejected {
            operation: "publish".to_string(),
            reason: e.to_string(),
        })?;
        let mut graphs = self.graphs.lock().await;
        if graph.is_empty() {
            graphs.remove(graph_iri);
        } else {
            graphs.insert(graph_iri.to_string(), graph);
        }
        Ok(())
    }

    async fn retract(&self, graph_iri: &str) -> Result<(), StoreError> {
        check_iri(graph_iri)?;
        self.graphs.lock().await.remove(graph_iri);
        Ok(())
    }

    async fn add_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        let triple = self.membership_triple(dataset_iri)?;
        let mut graphs = self.graphs.lock().await;
        graphs
            .entry(self.catalog_iri.clone())
            .or_default()
            .insert(triple);
        Ok(())
    }

    async fn remove_membership(&self, dataset_iri: &str) -> Result<(), StoreError> {
        let triple = self.membership_triple(dataset_iri)?;
        let mut graphs = self.graphs.lock().await;
        let now_empty = match graphs.get_mut(&self.catalog_iri) {
            Some(graph) => {
                graph.remove(triple);
                graph.is_empty()
            }
            None => false,
        };
        if now_empty {
            graphs.remove(&self.catalog_iri);
        }
        Ok(())
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        self.graphs.lock().await.clear();
        Ok(())
    }
}
