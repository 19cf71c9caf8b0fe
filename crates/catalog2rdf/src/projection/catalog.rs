use oxrdf::vocab::{rdf, xsd};
use oxrdf::NamedNode;

use crate::emitter::GraphBuilder;
use crate::model::iri::IriMinter;
use crate::model::record::{present, CatalogRecord};
use crate::model::vocab::{dcat, dct, foaf};

/// Emits the catalog node and its membership triples.
///
/// All catalog rows describe the single `{base}/catalog` node, whose graph
/// shares its name.
#[derive(Debug, Clone)]
pub struct CatalogProjector {
    iris: IriMinter,
    catalog: NamedNode,
}

impl CatalogProjector {
    pub fn new(base_uri: &str) -> Self {
        let iris = IriMinter::new(base_uri);
        let catalog = NamedNode::new_unchecked(iris.catalog_iri());
        Self { iris, catalog }
    }

    pub fn catalog_iri(&self) -> &str {
        self.catalog.as_str()
    }

    /// Describe one catalog row on the catalog node.
    pub fn emit_catalog(&self, builder: &mut GraphBuilder, record: &CatalogRecord) {
        let catalog = self.catalog.as_ref();
        builder.emit_iri(catalog, rdf::TYPE, dcat::CATALOG);

        let title = record.title.trim();
        if !title.is_empty() {
            builder.emit_literal(catalog, dct::TITLE, title);
        }
        if let Some(description) = present(&record.description) {
            builder.emit_literal(catalog, dct::DESCRIPTION, description);
        }
        for (predicate, value) in [(dct::ISSUED, &record.issued), (dct::MODIFIED, &record.modified)] {
            if let Some(lexical) = value.as_ref().map(|ts| ts.lexical()) {
                if !lexical.trim().is_empty() {
                    builder.emit_typed_literal(catalog, predicate, &lexical, xsd::DATE_TIME);
                }
            }
        }
        if let Some(name) = present(&record.publisher) {
            let publisher = NamedNode::new_unchecked(self.iris.catalog_publisher_iri());
            builder.emit_iri(catalog, dct::PUBLISHER, publisher.as_ref());
            builder.emit_iri(publisher.as_ref(), rdf::TYPE, foaf::AGENT);
            builder.emit_literal(publisher.as_ref(), foaf::NAME, name);
        }
    }

    /// Record `dataset_iri` as a member of the catalog.
    pub fn emit_membership(&self, builder: &mut GraphBuilder, dataset_iri: &NamedNode) {
        builder.emit_iri(self.catalog.as_ref(), dcat::DATASET_PROP, dataset_iri.as_ref());
    }
}
