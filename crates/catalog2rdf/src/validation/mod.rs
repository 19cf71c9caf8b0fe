//! Conformance checking of projected documents against a SHACL shape graph.
//!
//! The validator implements the SHACL-core subset the catalog shape graph
//! uses: class/node/subjects-of/objects-of targets, predicate and inverse
//! paths, cardinality, value type, string, value-set and closed-shape
//! constraints. Data is closed under RDFS entailment (using ontology axioms
//! found in the shape graph) before targets are resolved.

pub mod constraints;
pub mod inference;
pub mod report;
pub mod shapes;

use std::collections::HashSet;
use std::path::Path;

use oxrdf::vocab::{rdf, rdfs};
use oxrdf::{Graph, Term, TermRef};
use tracing::debug;

use crate::emitter::turtle::parse_turtle;
use crate::error::ValidationError;

pub use report::{ValidationReport, ValidationResult};
pub use shapes::{NodeShape, PropertyPath, PropertyShape, Severity, Target};

use shapes::{as_subject, compile_shapes};

/// Shape graph shipped with the crate.
pub const BUNDLED_SHAPES: &str = include_str!("../../shapes/dcat-dataset-shape.ttl");

/// Validates candidate documents against a compiled shape graph.
#[derive(Debug, Clone)]
pub struct ConformanceValidator {
    shapes: Vec<NodeShape>,
    ontology: Graph,
}

impl ConformanceValidator {
    /// Compile a shape graph given as Turtle.
    pub fn from_turtle(text: &str) -> Result<Self, ValidationError> {
        let graph = parse_turtle(text).map_err(|e| ValidationError::Shapes(e.to_string()))?;
        let shapes = compile_shapes(&graph)?;

        let mut ontology = Graph::new();
        for predicate in [
            rdfs::SUB_CLASS_OF,
            rdfs::SUB_PROPERTY_OF,
            rdfs::DOMAIN,
            rdfs::RANGE,
        ] {
            for triple in graph.triples_for_predicate(predicate) {
                ontology.insert(triple);
            }
        }

        debug!(
            shapes = shapes.len(),
            axioms = ontology.len(),
            "compiled shape graph"
        );
        Ok(Self { shapes, ontology })
    }

    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::Shapes(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_turtle(&text)
    }

    /// Validator for the shape graph shipped with the crate.
    pub fn bundled() -> Result<Self, ValidationError> {
        Self::from_turtle(BUNDLED_SHAPES)
    }

    /// Number of node shapes, including deactivated ones.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Parse `ttl` and validate it.
    ///
    /// A syntax error is an input error; non-conformance is reported in the
    /// returned report, not as an error.
    pub fn validate_turtle(&self, ttl: &str) -> Result<ValidationReport, ValidationError> {
        let data = parse_turtle(ttl).map_err(ValidationError::Syntax)?;
        Ok(self.validate_graph(&data))
    }

    /// Validate `ttl` and turn non-conformance into an error carrying the
    /// report text.
    pub fn check_turtle(&self, ttl: &str) -> Result<(), ValidationError> {
        let report = self.validate_turtle(ttl)?;
        if report.conforms {
            Ok(())
        } else {
            Err(ValidationError::NonConformant {
                report: report.text(),
            })
        }
    }

    pub fn validate_graph(&self, data: &Graph) -> ValidationReport {
        let graph = inference::rdfs_closure(data, &self.ontology);
        let mut results = Vec::new();

        for shape in self.shapes.iter().filter(|s| !s.deactivated) {
            for focus in focus_nodes(&graph, shape) {
                validate_focus(&graph, shape, focus.as_ref(), &mut results);
            }
        }

        debug!(
            triples = data.len(),
            inferred = graph.len() - data.len(),
            results = results.len(),
            "validated document"
        );
        ValidationReport::from_results(results)
    }
}

fn focus_nodes(graph: &Graph, shape: &NodeShape) -> Vec<Term> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    let mut add = |term: TermRef<'_>| {
        if seen.insert(term.into_owned()) {
            nodes.push(term.into_owned());
        }
    };

    for target in &shape.targets {
        match target {
            Target::Class(class) => graph
                .subjects_for_predicate_object(rdf::TYPE, class.as_ref())
                .for_each(|s| add(s.into())),
            Target::Node(node) => add(node.as_ref()),
            Target::SubjectsOf(predicate) => graph
                .triples_for_predicate(predicate.as_ref())
                .for_each(|t| add(t.subject.into())),
            Target::ObjectsOf(predicate) => graph
                .triples_for_predicate(predicate.as_ref())
                .for_each(|t| add(t.object)),
        }
    }
    nodes
}

fn value_nodes<'g>(graph: &'g Graph, focus: TermRef<'_>, path: &PropertyPath) -> Vec<TermRef<'g>> {
    match path {
        PropertyPath::Predicate(predicate) => match as_subject(focus) {
            Some(subject) => graph
                .objects_for_subject_predicate(subject, predicate.as_ref())
                .collect(),
            None => Vec::new(),
        },
        PropertyPath::Inverse(predicate) => graph
            .subjects_for_predicate_object(predicate.as_ref(), focus)
            .map(Into::into)
            .collect(),
    }
}

fn validate_focus(
    graph: &Graph,
    shape: &NodeShape,
    focus: TermRef<'_>,
    results: &mut Vec<ValidationResult>,
) {
    let result = |path: Option<PropertyPath>,
                  component: &'static str,
                  value: Option<Term>,
                  source: &oxrdf::Subject,
                  severity: Severity,
                  message: String| ValidationResult {
        focus_node: focus.into_owned(),
        result_path: path,
        value,
        source_shape: source.clone(),
        source_constraint: component,
        severity,
        message,
    };

    for constraint in &shape.constraints {
        for violation in constraint.evaluate(graph, &[focus]) {
            results.push(result(
                None,
                violation.component,
                violation.value,
                &shape.id,
                shape.severity,
                shape.message.clone().unwrap_or(violation.message),
            ));
        }
    }

    for property in shape.properties.iter().filter(|p| !p.deactivated) {
        let values = value_nodes(graph, focus, &property.path);
        for constraint in &property.constraints {
            for violation in constraint.evaluate(graph, &values) {
                results.push(result(
                    Some(property.path.clone()),
                    violation.component,
                    violation.value,
                    &property.id,
                    property.severity,
                    property.message.clone().unwrap_or(violation.message),
                ));
            }
        }
    }

    if let (Some(closed), Some(subject)) = (&shape.closed, as_subject(focus)) {
        for triple in graph.triples_for_subject(subject) {
            if closed.allowed.contains(&triple.predicate.into_owned()) {
                continue;
            }
            results.push(result(
                Some(PropertyPath::Predicate(triple.predicate.into_owned())),
                "ClosedConstraintComponent",
                Some(triple.object.into_owned()),
                &shape.id,
                shape.severity,
                shape.message.clone().unwrap_or_else(|| {
                    format!("Predicate {} is not allowed (closed shape)", triple.predicate)
                }),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPES: &str = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix ex: <http://example.org/> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

ex:Child rdfs:subClassOf ex:Parent .

ex:ParentShape a sh:NodeShape ;
    sh:targetClass ex:Parent ;
    sh:closed true ;
    sh:ignoredProperties ( <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> ) ;
    sh:property [ sh:path ex:name ; sh:minCount 1 ] .

ex:LinkShape sh:targetObjectsOf ex:link ;
    sh:nodeKind sh:IRI .

ex:Off a sh:NodeShape ; sh:targetClass ex:Parent ; sh:deactivated true ;
    sh:property [ sh:path ex:never ; sh:minCount 1 ] .
"#;

    fn validate(data: &str) -> ValidationReport {
        let validator = ConformanceValidator::from_turtle(SHAPES).unwrap();
        validator
            .validate_turtle(&format!("@prefix ex: <http://example.org/> .\n{data}"))
            .unwrap()
    }

    #[test]
    fn subclass_instances_are_targeted() {
        let report = validate("ex:c a ex:Child .");
        assert!(!report.conforms);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].source_constraint, "MinCountConstraintComponent");
    }

    #[test]
    fn closed_shapes_flag_undeclared_predicates() {
        let report = validate("ex:c a ex:Parent ; ex:name \"n\" ; ex:extra 1 .");
        assert_eq!(report.results.len(), 1, "{}", report.text());
        assert_eq!(report.results[0].source_constraint, "ClosedConstraintComponent");
    }

    #[test]
    fn objects_of_targets_check_node_kind() {
        let report = validate("ex:a ex:link \"text\" . ex:b ex:link ex:c .");
        assert_eq!(report.results.len(), 1, "{}", report.text());
        assert_eq!(report.results[0].source_constraint, "NodeKindConstraintComponent");
    }

    #[test]
    fn syntax_errors_are_input_errors() {
        let validator = ConformanceValidator::from_turtle(SHAPES).unwrap();
        let err = validator.validate_turtle("ex:a ex:b").unwrap_err();
        assert!(matches!(err, ValidationError::Syntax(_)));
    }

    #[test]
    fn bundled_shapes_compile() {
        let validator = ConformanceValidator::bundled().unwrap();
        assert_eq!(validator.shape_count(), 4);
    }
}
