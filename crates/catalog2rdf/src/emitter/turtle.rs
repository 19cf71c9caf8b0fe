//! Turtle serialization and parsing.

use oxrdf::vocab::rdf;
use oxrdf::{Graph, NamedNodeRef, TripleRef};
use oxttl::{TurtleParser, TurtleSerializer};

use crate::error::{RdfParseError, SerializeError};
use crate::model::vocab::{dcat, dct, foaf, vcard};

/// Prefixes declared at the top of every serialized document.
pub const PREFIXES: &[(&str, &str)] = &[
    (dcat::PREFIX, dcat::NS),
    (dct::PREFIX, dct::NS),
    (foaf::PREFIX, foaf::NS),
    (vcard::PREFIX, vcard::NS),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// Serialize a graph as Turtle with the catalog prefixes.
pub fn serialize_graph(graph: &Graph) -> Result<String, SerializeError> {
    let mut serializer = TurtleSerializer::new();
    for (prefix, iri) in PREFIXES {
        serializer = serializer.with_prefix(*prefix, *iri)?;
    }
    let mut writer = serializer.for_writer(Vec::new());
    for triple in graph {
        writer.serialize_triple(triple)?;
    }
    Ok(String::from_utf8(writer.finish()?)?)
}

/// Parse Turtle text into a graph.
pub fn parse_turtle(text: &str) -> Result<Graph, RdfParseError> {
    let mut graph = Graph::new();
    for triple in TurtleParser::new().for_slice(text.as_bytes()) {
        let triple = triple.map_err(|e| RdfParseError {
            format: "Turtle",
            message: e.to_string(),
        })?;
        graph.insert(&triple);
    }
    Ok(graph)
}

/// Whether `graph` types `subject` as a `dcat:Dataset`.
pub fn types_as_dataset(graph: &Graph, subject: &str) -> bool {
    NamedNodeRef::new(subject)
        .is_ok_and(|s| graph.contains(TripleRef::new(s, rdf::TYPE, dcat::DATASET)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::GraphBuilder;

    const S: NamedNodeRef<'static> = NamedNodeRef::new_unchecked("http://example.org/id/x");

    #[test]
    fn escaping_survives_a_round_trip() {
        let mut builder = GraphBuilder::new();
        builder.emit_literal(S, dct::TITLE, "line1\nline2 \"quoted\" \\ back");
        let ttl = serialize_graph(builder.graph()).unwrap();
        let parsed = parse_turtle(&ttl).unwrap();
        assert_eq!(&parsed, builder.graph());
    }

    #[test]
    fn prefixes_are_declared() {
        let mut builder = GraphBuilder::new();
        builder.emit_iri(S, rdf::TYPE, dcat::DATASET);
        let ttl = serialize_graph(builder.graph()).unwrap();
        assert!(ttl.contains("@prefix dcat: <http://www.w3.org/ns/dcat#>"), "{ttl}");
        assert!(types_as_dataset(&parse_turtle(&ttl).unwrap(), S.as_str()));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = parse_turtle("<http://example.org/s> <http://example.org/p> .").unwrap_err();
        assert_eq!(err.format, "Turtle");
    }
}
