//! SPARQL update requests, graph store URLs and Fuseki admin requests.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::model::vocab::dcat;

/// Clears every named graph.
pub const CLEAR_NAMED_GRAPHS: &str = "DELETE WHERE { GRAPH ?g { ?s ?p ?o } }";

/// Clears the default graph.
pub const CLEAR_DEFAULT_GRAPH: &str = "DELETE WHERE { ?s ?p ?o }";

/// Unreserved characters (RFC 3986) are left as is in query values.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Add `dataset_iri` to the catalog graph.
pub fn insert_membership(catalog_iri: &str, dataset_iri: &str) -> String {
    format!(
        "INSERT DATA {{ GRAPH <{catalog_iri}> {{ <{catalog_iri}> <{}> <{dataset_iri}> }} }}",
        dcat::DATASET_PROP.as_str()
    )
}

/// Remove `dataset_iri` from the catalog graph. A no-op when absent.
pub fn delete_membership(catalog_iri: &str, dataset_iri: &str) -> String {
    format!(
        "DELETE WHERE {{ GRAPH <{catalog_iri}> {{ <{catalog_iri}> <{}> <{dataset_iri}> }} }}",
        dcat::DATASET_PROP.as_str()
    )
}

/// Graph store protocol URL addressing `graph_iri` under `data_url`.
pub fn graph_url(data_url: &str, graph_iri: &str) -> String {
    let separator = if data_url.contains('?') { '&' } else { '?' };
    format!(
        "{data_url}{separator}graph={}",
        utf8_percent_encode(graph_iri, QUERY_VALUE)
    )
}

/// Where a Fuseki server manages its datasets, and the dataset name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetAdmin {
    /// `{server}/$/datasets`
    pub datasets_url: String,
    pub name: String,
}

/// Derive the admin endpoint from a `{server}/{dataset}/...` data URL.
pub fn dataset_admin(data_url: &str) -> Option<DatasetAdmin> {
    let (scheme, rest) = data_url.split_once("://")?;
    let (authority, path) = rest.split_once('/')?;
    let name = path.split(['/', '?']).next().filter(|n| !n.is_empty())?;
    Some(DatasetAdmin {
        datasets_url: format!("{scheme}://{authority}/$/datasets"),
        name: name.to_string(),
    })
}

/// Form body creating a persistent (TDB2) dataset.
pub fn create_dataset_form(name: &str) -> String {
    format!("dbName={}&dbType=tdb2", utf8_percent_encode(name, QUERY_VALUE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_updates_target_the_catalog_graph() {
        let insert = insert_membership("https://x.org/catalog", "https://x.org/id/a");
        assert_eq!(
            insert,
            "INSERT DATA { GRAPH <https://x.org/catalog> { <https://x.org/catalog> \
             <http://www.w3.org/ns/dcat#dataset> <https://x.org/id/a> } }"
        );
        assert!(delete_membership("https://x.org/catalog", "https://x.org/id/a")
            .starts_with("DELETE WHERE { GRAPH <https://x.org/catalog> {"));
    }

    #[test]
    fn graph_iri_is_percent_encoded() {
        assert_eq!(
            graph_url("http://fuseki:3030/ds/data", "https://x.org/id/a b"),
            "http://fuseki:3030/ds/data?graph=https%3A%2F%2Fx.org%2Fid%2Fa%20b"
        );
        assert!(graph_url("http://h/data?x=1", "urn:g").starts_with("http://h/data?x=1&graph="));
    }

    #[test]
    fn admin_endpoint_comes_from_the_data_url() {
        assert_eq!(
            dataset_admin("http://fuseki:3030/semantic_data_catalog/data"),
            Some(DatasetAdmin {
                datasets_url: "http://fuseki:3030/$/datasets".to_string(),
                name: "semantic_data_catalog".to_string(),
            })
        );
        assert_eq!(dataset_admin("http://fuseki:3030/"), None);
        assert_eq!(dataset_admin("fuseki/data"), None);
    }

    #[test]
    fn create_form_names_a_tdb2_dataset() {
        assert_eq!(create_dataset_form("catalog"), "dbName=catalog&dbType=tdb2");
    }
}
