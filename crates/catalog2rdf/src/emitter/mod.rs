//! In-memory triple building and RDF text serialization.
//!
//! Graphs are assembled through [`GraphBuilder`] and only turned into text by
//! [`turtle::serialize_graph`], so literal escaping and IRI syntax are handled
//! by the RDF model rather than by string templates.

pub mod ntriples;
pub mod turtle;

use oxrdf::{Graph, Literal, NamedNodeRef, SubjectRef, TripleRef};

/// Accumulates triples for one RDF document.
#[derive(Debug, Default, Clone)]
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a triple with an IRI object.
    pub fn emit_iri<'a>(
        &mut self,
        subject: impl Into<SubjectRef<'a>>,
        predicate: NamedNodeRef<'a>,
        object: NamedNodeRef<'a>,
    ) {
        self.graph.insert(TripleRef {
            subject: subject.into(),
            predicate,
            object: object.into(),
        });
    }

    /// Emit a triple with a plain string literal object.
    pub fn emit_literal<'a>(
        &mut self,
        subject: impl Into<SubjectRef<'a>>,
        predicate: NamedNodeRef<'a>,
        value: &str,
    ) {
        let literal = Literal::new_simple_literal(value);
        self.graph.insert(TripleRef {
            subject: subject.into(),
            predicate,
            object: literal.as_ref().into(),
        });
    }

    /// Emit a triple with a typed literal object.
    pub fn emit_typed_literal<'a>(
        &mut self,
        subject: impl Into<SubjectRef<'a>>,
        predicate: NamedNodeRef<'a>,
        value: &str,
        datatype: NamedNodeRef<'a>,
    ) {
        let literal = Literal::new_typed_literal(value, datatype);
        self.graph.insert(TripleRef {
            subject: subject.into(),
            predicate,
            object: literal.as_ref().into(),
        });
    }

    /// Copy every triple of `other` into this document.
    pub fn merge(&mut self, other: &Graph) {
        for triple in other {
            self.graph.insert(triple);
        }
    }

    /// Return the number of distinct triples emitted so far.
    pub fn triple_count(&self) -> usize {
        self.graph.len()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}
