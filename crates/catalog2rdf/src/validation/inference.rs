//! RDFS entailment applied to the data graph before validation.
//!
//! Covers rdfs2 (domain), rdfs3 (range), rdfs7 (subPropertyOf) and rdfs9
//! (subClassOf). Transitivity of the hierarchies falls out of iterating to a
//! fixpoint.

use std::collections::HashMap;

use oxrdf::vocab::{rdf, rdfs};
use oxrdf::{Graph, NamedNode, NamedNodeRef, SubjectRef, TermRef, Triple, TripleRef};

use super::shapes::as_subject;

/// Schema axioms gathered from the data and the shape graph.
#[derive(Debug, Default)]
struct Schema {
    super_classes: HashMap<String, Vec<NamedNode>>,
    super_properties: HashMap<String, Vec<NamedNode>>,
    domains: HashMap<String, Vec<NamedNode>>,
    ranges: HashMap<String, Vec<NamedNode>>,
}

impl Schema {
    fn collect(graphs: &[&Graph]) -> Self {
        let mut schema = Schema::default();
        for graph in graphs {
            for (predicate, table) in [
                (rdfs::SUB_CLASS_OF, &mut schema.super_classes),
                (rdfs::SUB_PROPERTY_OF, &mut schema.super_properties),
                (rdfs::DOMAIN, &mut schema.domains),
                (rdfs::RANGE, &mut schema.ranges),
            ] {
                for triple in graph.triples_for_predicate(predicate) {
                    if let (SubjectRef::NamedNode(s), TermRef::NamedNode(o)) =
                        (triple.subject, triple.object)
                    {
                        table
                            .entry(s.as_str().to_string())
                            .or_default()
                            .push(o.into_owned());
                    }
                }
            }
        }
        schema
    }

    fn is_empty(&self) -> bool {
        self.super_classes.is_empty()
            && self.super_properties.is_empty()
            && self.domains.is_empty()
            && self.ranges.is_empty()
    }
}

/// Return `data` extended with everything the RDFS rules derive from it and
/// the `ontology` axioms.
pub fn rdfs_closure(data: &Graph, ontology: &Graph) -> Graph {
    let schema = Schema::collect(&[data, ontology]);
    let mut graph = data.clone();
    if schema.is_empty() {
        return graph;
    }

    loop {
        let mut inferred = Vec::new();
        for triple in graph.iter() {
            entail(&schema, triple, &mut inferred);
        }
        let before = graph.len();
        for triple in &inferred {
            graph.insert(triple);
        }
        if graph.len() == before {
            return graph;
        }
    }
}

fn entail(schema: &Schema, triple: TripleRef<'_>, out: &mut Vec<Triple>) {
    let predicate = triple.predicate.as_str();
    if triple.predicate == rdf::TYPE {
        if let TermRef::NamedNode(class) = triple.object {
            for parent in schema.super_classes.get(class.as_str()).into_iter().flatten() {
                out.push(derived(triple.subject, rdf::TYPE, parent.as_ref().into()));
            }
        }
    }
    for parent in schema.super_properties.get(predicate).into_iter().flatten() {
        out.push(derived(triple.subject, parent.as_ref(), triple.object));
    }
    for class in schema.domains.get(predicate).into_iter().flatten() {
        out.push(derived(triple.subject, rdf::TYPE, class.as_ref().into()));
    }
    if let Some(object) = as_subject(triple.object) {
        for class in schema.ranges.get(predicate).into_iter().flatten() {
            out.push(derived(object, rdf::TYPE, class.as_ref().into()));
        }
    }
}

fn derived(subject: SubjectRef<'_>, predicate: NamedNodeRef<'_>, object: TermRef<'_>) -> Triple {
    TripleRef::new(subject, predicate, object).into_owned()
}
