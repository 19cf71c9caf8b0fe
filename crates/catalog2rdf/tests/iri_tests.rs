use catalog2rdf::model::iri::{check_http_iri, mailto_iri, IriMinter};
use catalog2rdf::ValueError;

const BASE: &str = "https://semantic-data-catalog.com";

fn minter() -> IriMinter {
    IriMinter::new(BASE)
}

// --- Dataset IRIs ---

#[test]
fn dataset_iri_basic() {
    assert_eq!(
        minter().dataset_iri("dataset-1"),
        "https://semantic-data-catalog.com/id/dataset-1"
    );
}

#[test]
fn dataset_iri_ignores_trailing_slash_on_base() {
    let m = IriMinter::new("https://semantic-data-catalog.com/");
    assert_eq!(m.dataset_iri("x"), minter().dataset_iri("x"));
}

#[test]
fn dataset_iri_is_deterministic() {
    assert_eq!(minter().dataset_iri("a"), minter().dataset_iri("a"));
    assert_ne!(minter().dataset_iri("a"), minter().dataset_iri("b"));
}

#[test]
fn satellite_iris_hang_off_the_dataset() {
    let m = minter();
    let ds = m.dataset_iri("dataset-1");
    assert_eq!(m.distribution_iri(&ds), format!("{ds}/distribution"));
    assert_eq!(m.publisher_iri(&ds), format!("{ds}/publisher"));
    assert_eq!(m.contact_iri(&ds), format!("{ds}/contact"));
}

#[test]
fn catalog_iri_is_shared() {
    assert_eq!(
        minter().catalog_iri(),
        "https://semantic-data-catalog.com/catalog"
    );
    assert_eq!(
        minter().catalog_publisher_iri(),
        "https://semantic-data-catalog.com/catalog/publisher"
    );
}

// --- Dataset nodes ---

#[test]
fn dataset_node_rejects_blank_identifier() {
    let err = minter().dataset_node("  ").unwrap_err();
    assert_eq!(err, ValueError::MissingField { field: "identifier" });
}

#[test]
fn dataset_node_rejects_identifier_with_spaces() {
    let err = minter().dataset_node("has space").unwrap_err();
    assert!(matches!(err, ValueError::InvalidIdentifier { .. }), "{err:?}");
    assert_eq!(err.field(), "identifier");
}

#[test]
fn dataset_node_accepts_uuid() {
    let node = minter()
        .dataset_node("0b9d6f0e-6c55-4b8e-9d3a-0c7f1e2a3b4c")
        .unwrap();
    assert!(node.as_str().ends_with("/id/0b9d6f0e-6c55-4b8e-9d3a-0c7f1e2a3b4c"));
}

// --- User-supplied IRIs ---

#[test]
fn http_and_https_are_accepted() {
    assert!(check_http_iri("access_url_dataset", "http://example.org/d1.csv").is_ok());
    assert!(check_http_iri("access_url_dataset", "HTTPS://example.org:8443/x?y=1").is_ok());
}

#[test]
fn free_text_is_rejected() {
    let err = check_http_iri("access_url_dataset", "not a url").unwrap_err();
    assert_eq!(err.field(), "access_url_dataset");
}

#[test]
fn other_schemes_are_rejected() {
    let err = check_http_iri("webid", "ftp://host/x").unwrap_err();
    assert!(err.to_string().contains("ftp"), "{err}");
}

#[test]
fn relative_paths_are_rejected() {
    assert!(check_http_iri("access_url_dataset", "relative/path.csv").is_err());
}

#[test]
fn missing_host_is_rejected() {
    assert!(check_http_iri("theme", "http:///path").is_err());
}

// --- Contact addresses ---

#[test]
fn email_contact_becomes_mailto() {
    let iri = mailto_iri("sensors@example.org").unwrap();
    assert_eq!(iri.as_str(), "mailto:sensors@example.org");
}

#[test]
fn free_text_contact_has_no_mailto() {
    assert!(mailto_iri("Energy Office hotline").is_none());
    assert!(mailto_iri("@example.org").is_none());
    assert!(mailto_iri("a@b@c").is_none());
}
