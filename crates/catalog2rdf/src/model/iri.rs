//! IRI minting for catalog resources and validation of user-supplied IRIs.

use oxiri::Iri;
use oxrdf::NamedNode;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::ValueError;

/// Characters escaped in the address part of a `mailto:` IRI.
const MAILTO_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'#')
    .add(b'?')
    .add(b'%');

/// Generates stable IRIs for datasets and their satellite nodes.
///
/// Identifiers are not escaped: callers supply UUIDs or pre-validated slugs.
#[derive(Debug, Clone)]
pub struct IriMinter {
    base_uri: String,
}

impl IriMinter {
    pub fn new(base_uri: &str) -> Self {
        Self {
            base_uri: base_uri.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// IRI of a dataset node, also the name of its graph.
    pub fn dataset_iri(&self, identifier: &str) -> String {
        format!("{}/id/{}", self.base_uri, identifier)
    }

    pub fn distribution_iri(&self, dataset_iri: &str) -> String {
        format!("{dataset_iri}/distribution")
    }

    pub fn publisher_iri(&self, dataset_iri: &str) -> String {
        format!("{dataset_iri}/publisher")
    }

    pub fn contact_iri(&self, dataset_iri: &str) -> String {
        format!("{dataset_iri}/contact")
    }

    /// IRI of the catalog node; the catalog graph is named after it.
    pub fn catalog_iri(&self) -> String {
        format!("{}/catalog", self.base_uri)
    }

    pub fn catalog_publisher_iri(&self) -> String {
        format!("{}/catalog/publisher", self.base_uri)
    }

    /// Mint the dataset IRI and check it is a well-formed IRI.
    pub fn dataset_node(&self, identifier: &str) -> Result<NamedNode, ValueError> {
        if identifier.trim().is_empty() {
            return Err(ValueError::MissingField {
                field: "identifier",
            });
        }
        NamedNode::new(self.dataset_iri(identifier)).map_err(|e| ValueError::InvalidIdentifier {
            value: identifier.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Check that `value` is an absolute `http`/`https` IRI with a host.
///
/// `field` names the record field in the returned error.
pub fn check_http_iri(field: &'static str, value: &str) -> Result<NamedNode, ValueError> {
    let invalid = |reason: String| ValueError::InvalidIri {
        field,
        value: value.to_string(),
        reason,
    };

    let iri = Iri::parse(value).map_err(|e| invalid(e.to_string()))?;
    let scheme = iri.scheme().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(invalid(format!("scheme `{scheme}` is not http or https")));
    }
    let authority = iri
        .authority()
        .ok_or_else(|| invalid("missing authority".to_string()))?;
    if host(authority).is_empty() {
        return Err(invalid("empty host".to_string()));
    }
    Ok(NamedNode::new_unchecked(iri.into_inner()))
}

/// Strip userinfo and port from an IRI authority.
fn host(authority: &str) -> &str {
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    if host.starts_with('[') {
        return host;
    }
    host.split_once(':').map_or(host, |(host, _)| host)
}

/// `mailto:` IRI for an email-like contact point, if it looks like one.
pub fn mailto_iri(contact_point: &str) -> Option<NamedNode> {
    let address = contact_point.trim();
    let (local, domain) = address.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    let encoded = utf8_percent_encode(address, MAILTO_ENCODE_SET);
    NamedNode::new(format!("mailto:{encoded}")).ok()
}
