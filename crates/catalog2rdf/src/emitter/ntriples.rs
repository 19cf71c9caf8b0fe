//! N-Triples parsing for supplementary RDF uploads.

use oxrdf::Graph;
use oxttl::NTriplesParser;

use crate::error::RdfParseError;

/// Parse N-Triples text into a graph.
pub fn parse_ntriples(text: &str) -> Result<Graph, RdfParseError> {
    let mut graph = Graph::new();
    for triple in NTriplesParser::new().for_slice(text.as_bytes()) {
        let triple = triple.map_err(|e| RdfParseError {
            format: "N-Triples",
            message: e.to_string(),
        })?;
        graph.insert(&triple);
    }
    Ok(graph)
}

/// Parse supplementary RDF, choosing the syntax from the file name.
///
/// `.nt` files are read as N-Triples; everything else as Turtle.
pub fn parse_supplementary(text: &str, file_name: Option<&str>) -> Result<Graph, RdfParseError> {
    let is_ntriples = file_name
        .map(|name| name.to_ascii_lowercase().ends_with(".nt"))
        .unwrap_or(false);
    if is_ntriples {
        parse_ntriples(text)
    } else {
        super::turtle::parse_turtle(text)
    }
}
