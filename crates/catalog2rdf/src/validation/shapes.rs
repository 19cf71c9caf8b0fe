//! Compilation of a SHACL shape graph into node and property shapes.

use std::collections::HashSet;
use std::fmt;

use oxrdf::vocab::{rdf, rdfs};
use oxrdf::{Graph, NamedNode, NamedNodeRef, Subject, SubjectRef, Term, TermRef, TripleRef};
use regex::Regex;

use super::constraints::{Constraint, Pattern};
use crate::error::ValidationError;
use crate::model::vocab::sh;

// ----------------------------------------------------------------------------
// Shape model
// ----------------------------------------------------------------------------

/// How a node shape selects its focus nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `sh:targetClass`, or an implicit class target when the shape is itself
    /// an `rdfs:Class`.
    Class(NamedNode),
    /// `sh:targetNode`
    Node(Term),
    /// `sh:targetSubjectsOf`
    SubjectsOf(NamedNode),
    /// `sh:targetObjectsOf`
    ObjectsOf(NamedNode),
}

/// A property path. Only predicate and inverse predicate paths are supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    Predicate(NamedNode),
    Inverse(NamedNode),
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::Predicate(p) => write!(f, "{p}"),
            PropertyPath::Inverse(p) => write!(f, "^{p}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    BlankNode,
    Iri,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    fn from_iri(iri: NamedNodeRef<'_>) -> Option<Self> {
        let kind = match iri {
            i if i == sh::BLANK_NODE => NodeKind::BlankNode,
            i if i == sh::IRI => NodeKind::Iri,
            i if i == sh::LITERAL => NodeKind::Literal,
            i if i == sh::BLANK_NODE_OR_IRI => NodeKind::BlankNodeOrIri,
            i if i == sh::BLANK_NODE_OR_LITERAL => NodeKind::BlankNodeOrLiteral,
            i if i == sh::IRI_OR_LITERAL => NodeKind::IriOrLiteral,
            _ => return None,
        };
        Some(kind)
    }

    pub fn matches(self, term: TermRef<'_>) -> bool {
        let (blank, iri, literal) = match term {
            TermRef::BlankNode(_) => (true, false, false),
            TermRef::NamedNode(_) => (false, true, false),
            TermRef::Literal(_) => (false, false, true),
            #[allow(unreachable_patterns)]
            _ => (false, false, false),
        };
        match self {
            NodeKind::BlankNode => blank,
            NodeKind::Iri => iri,
            NodeKind::Literal => literal,
            NodeKind::BlankNodeOrIri => blank || iri,
            NodeKind::BlankNodeOrLiteral => blank || literal,
            NodeKind::IriOrLiteral => iri || literal,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::BlankNode => "sh:BlankNode",
            NodeKind::Iri => "sh:IRI",
            NodeKind::Literal => "sh:Literal",
            NodeKind::BlankNodeOrIri => "sh:BlankNodeOrIRI",
            NodeKind::BlankNodeOrLiteral => "sh:BlankNodeOrLiteral",
            NodeKind::IriOrLiteral => "sh:IRIOrLiteral",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Violation,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Violation => "sh:Violation",
            Severity::Warning => "sh:Warning",
            Severity::Info => "sh:Info",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct PropertyShape {
    pub id: Subject,
    pub path: PropertyPath,
    pub constraints: Vec<Constraint>,
    pub severity: Severity,
    pub message: Option<String>,
    pub deactivated: bool,
}

/// `sh:closed true`: only the declared predicates (plus the ignored ones)
/// may appear on a focus node.
#[derive(Debug, Clone, Default)]
pub struct Closed {
    pub allowed: HashSet<NamedNode>,
}

#[derive(Debug, Clone)]
pub struct NodeShape {
    pub id: Subject,
    pub targets: Vec<Target>,
    pub properties: Vec<PropertyShape>,
    /// Constraints applied to the focus node itself.
    pub constraints: Vec<Constraint>,
    pub closed: Option<Closed>,
    pub severity: Severity,
    pub message: Option<String>,
    pub deactivated: bool,
}

// ----------------------------------------------------------------------------
// Compilation
// ----------------------------------------------------------------------------

const TARGET_PREDICATES: [NamedNodeRef<'static>; 4] = [
    sh::TARGET_CLASS,
    sh::TARGET_NODE,
    sh::TARGET_SUBJECTS_OF,
    sh::TARGET_OBJECTS_OF,
];

/// Compile every node shape declared in `graph`.
///
/// A node shape is any subject typed `sh:NodeShape` or carrying a target
/// predicate. Property shapes are reached through `sh:property`.
pub fn compile_shapes(graph: &Graph) -> Result<Vec<NodeShape>, ValidationError> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let declared = graph.subjects_for_predicate_object(rdf::TYPE, sh::NODE_SHAPE);
    let targeting = TARGET_PREDICATES
        .iter()
        .flat_map(|p| graph.triples_for_predicate(*p).map(|t| t.subject));
    for id in declared.chain(targeting) {
        if seen.insert(id) {
            ids.push(id);
        }
    }

    ids.into_iter()
        .map(|id| compile_node_shape(graph, id))
        .collect()
}

fn compile_node_shape(graph: &Graph, id: SubjectRef<'_>) -> Result<NodeShape, ValidationError> {
    let mut targets = Vec::new();
    for class in graph.objects_for_subject_predicate(id, sh::TARGET_CLASS) {
        targets.push(Target::Class(named(id, sh::TARGET_CLASS, class)?));
    }
    if let SubjectRef::NamedNode(node) = id {
        if graph.contains(TripleRef::new(node, rdf::TYPE, rdfs::CLASS)) {
            targets.push(Target::Class(node.into_owned()));
        }
    }
    for node in graph.objects_for_subject_predicate(id, sh::TARGET_NODE) {
        targets.push(Target::Node(node.into_owned()));
    }
    for predicate in graph.objects_for_subject_predicate(id, sh::TARGET_SUBJECTS_OF) {
        targets.push(Target::SubjectsOf(named(id, sh::TARGET_SUBJECTS_OF, predicate)?));
    }
    for predicate in graph.objects_for_subject_predicate(id, sh::TARGET_OBJECTS_OF) {
        targets.push(Target::ObjectsOf(named(id, sh::TARGET_OBJECTS_OF, predicate)?));
    }

    let mut properties = Vec::new();
    for property in graph.objects_for_subject_predicate(id, sh::PROPERTY) {
        let property = as_subject(property).ok_or_else(|| {
            ValidationError::Shapes(format!("sh:property of {id} is a literal"))
        })?;
        properties.push(compile_property_shape(graph, property)?);
    }

    let closed = if boolean(graph, id, sh::CLOSED) {
        let mut allowed: HashSet<NamedNode> = properties
            .iter()
            .filter_map(|p| match &p.path {
                PropertyPath::Predicate(predicate) => Some(predicate.clone()),
                PropertyPath::Inverse(_) => None,
            })
            .collect();
        if let Some(list) = graph.object_for_subject_predicate(id, sh::IGNORED_PROPERTIES) {
            for item in read_list(graph, list)? {
                allowed.insert(named(id, sh::IGNORED_PROPERTIES, item)?);
            }
        }
        Some(Closed { allowed })
    } else {
        None
    };

    Ok(NodeShape {
        id: id.into_owned(),
        targets,
        properties,
        constraints: compile_constraints(graph, id, false)?,
        closed,
        severity: severity(graph, id),
        message: message(graph, id),
        deactivated: boolean(graph, id, sh::DEACTIVATED),
    })
}

fn compile_property_shape(
    graph: &Graph,
    id: SubjectRef<'_>,
) -> Result<PropertyShape, ValidationError> {
    let path = graph
        .object_for_subject_predicate(id, sh::PATH)
        .ok_or_else(|| ValidationError::Shapes(format!("property shape {id} has no sh:path")))?;
    let path = match path {
        TermRef::NamedNode(predicate) => PropertyPath::Predicate(predicate.into_owned()),
        TermRef::BlankNode(node) => match graph.object_for_subject_predicate(node, sh::INVERSE_PATH) {
            Some(TermRef::NamedNode(predicate)) => PropertyPath::Inverse(predicate.into_owned()),
            _ => {
                return Err(ValidationError::Shapes(format!(
                    "property shape {id} uses an unsupported path"
                )))
            }
        },
        _ => {
            return Err(ValidationError::Shapes(format!(
                "property shape {id} has a literal sh:path"
            )))
        }
    };

    Ok(PropertyShape {
        id: id.into_owned(),
        path,
        constraints: compile_constraints(graph, id, true)?,
        severity: severity(graph, id),
        message: message(graph, id),
        deactivated: boolean(graph, id, sh::DEACTIVATED),
    })
}

/// Read the constraint parameters attached to a shape.
///
/// Cardinality only applies to property shapes.
fn compile_constraints(
    graph: &Graph,
    id: SubjectRef<'_>,
    property: bool,
) -> Result<Vec<Constraint>, ValidationError> {
    let mut constraints = Vec::new();

    if property {
        if let Some(n) = count(graph, id, sh::MIN_COUNT)? {
            constraints.push(Constraint::MinCount(n));
        }
        if let Some(n) = count(graph, id, sh::MAX_COUNT)? {
            constraints.push(Constraint::MaxCount(n));
        }
    }
    for datatype in graph.objects_for_subject_predicate(id, sh::DATATYPE) {
        constraints.push(Constraint::Datatype(named(id, sh::DATATYPE, datatype)?));
    }
    for kind in graph.objects_for_subject_predicate(id, sh::NODE_KIND) {
        let kind = named(id, sh::NODE_KIND, kind)?;
        let kind = NodeKind::from_iri(kind.as_ref()).ok_or_else(|| {
            ValidationError::Shapes(format!("unknown sh:nodeKind {kind} on {id}"))
        })?;
        constraints.push(Constraint::NodeKind(kind));
    }
    for class in graph.objects_for_subject_predicate(id, sh::CLASS) {
        constraints.push(Constraint::Class(named(id, sh::CLASS, class)?));
    }
    if let Some(pattern) = graph.object_for_subject_predicate(id, sh::PATTERN) {
        let source = literal_value(id, sh::PATTERN, pattern)?;
        let flags = graph
            .object_for_subject_predicate(id, sh::FLAGS)
            .map(|f| literal_value(id, sh::FLAGS, f))
            .transpose()?;
        constraints.push(Constraint::Pattern(compile_pattern(source, flags)?));
    }
    if let Some(n) = count(graph, id, sh::MIN_LENGTH)? {
        constraints.push(Constraint::MinLength(n));
    }
    if let Some(n) = count(graph, id, sh::MAX_LENGTH)? {
        constraints.push(Constraint::MaxLength(n));
    }
    if let Some(list) = graph.object_for_subject_predicate(id, sh::IN) {
        let values = read_list(graph, list)?
            .into_iter()
            .map(TermRef::into_owned)
            .collect();
        constraints.push(Constraint::In(values));
    }
    for value in graph.objects_for_subject_predicate(id, sh::HAS_VALUE) {
        constraints.push(Constraint::HasValue(value.into_owned()));
    }

    Ok(constraints)
}

fn compile_pattern(source: &str, flags: Option<&str>) -> Result<Pattern, ValidationError> {
    let mut expression = String::new();
    if let Some(flags) = flags {
        let supported: String = flags.chars().filter(|c| "imsx".contains(*c)).collect();
        if !supported.is_empty() {
            expression.push_str(&format!("(?{supported})"));
        }
    }
    expression.push_str(source);
    let regex = Regex::new(&expression)
        .map_err(|e| ValidationError::Shapes(format!("invalid sh:pattern {source:?}: {e}")))?;
    Ok(Pattern {
        source: source.to_string(),
        flags: flags.map(str::to_string),
        regex,
    })
}

// ----------------------------------------------------------------------------
// Graph helpers
// ----------------------------------------------------------------------------

pub(crate) fn as_subject(term: TermRef<'_>) -> Option<SubjectRef<'_>> {
    match term {
        TermRef::NamedNode(node) => Some(node.into()),
        TermRef::BlankNode(node) => Some(node.into()),
        _ => None,
    }
}

/// Items of the RDF collection starting at `head`.
fn read_list<'g>(graph: &'g Graph, head: TermRef<'g>) -> Result<Vec<TermRef<'g>>, ValidationError> {
    let malformed = || ValidationError::Shapes(format!("malformed RDF list at {head}"));
    let mut items = Vec::new();
    let mut node = head;
    while !matches!(node, TermRef::NamedNode(n) if n == rdf::NIL) {
        let cell = as_subject(node).ok_or_else(malformed)?;
        items.push(
            graph
                .object_for_subject_predicate(cell, rdf::FIRST)
                .ok_or_else(malformed)?,
        );
        node = graph
            .object_for_subject_predicate(cell, rdf::REST)
            .ok_or_else(malformed)?;
        if items.len() > graph.len() {
            return Err(malformed());
        }
    }
    Ok(items)
}

fn named(
    id: SubjectRef<'_>,
    parameter: NamedNodeRef<'_>,
    term: TermRef<'_>,
) -> Result<NamedNode, ValidationError> {
    match term {
        TermRef::NamedNode(node) => Ok(node.into_owned()),
        other => Err(ValidationError::Shapes(format!(
            "{parameter} on {id} must be an IRI, found {other}"
        ))),
    }
}

fn literal_value<'g>(
    id: SubjectRef<'_>,
    parameter: NamedNodeRef<'_>,
    term: TermRef<'g>,
) -> Result<&'g str, ValidationError> {
    match term {
        TermRef::Literal(literal) => Ok(literal.value()),
        other => Err(ValidationError::Shapes(format!(
            "{parameter} on {id} must be a literal, found {other}"
        ))),
    }
}

fn count(
    graph: &Graph,
    id: SubjectRef<'_>,
    parameter: NamedNodeRef<'_>,
) -> Result<Option<usize>, ValidationError> {
    graph
        .object_for_subject_predicate(id, parameter)
        .map(|term| {
            let text = literal_value(id, parameter, term)?;
            text.trim().parse::<usize>().map_err(|_| {
                ValidationError::Shapes(format!(
                    "{parameter} on {id} must be a non-negative integer, found {text:?}"
                ))
            })
        })
        .transpose()
}

fn boolean(graph: &Graph, id: SubjectRef<'_>, parameter: NamedNodeRef<'_>) -> bool {
    matches!(
        graph.object_for_subject_predicate(id, parameter),
        Some(TermRef::Literal(l)) if matches!(l.value(), "true" | "1")
    )
}

fn severity(graph: &Graph, id: SubjectRef<'_>) -> Severity {
    match graph.object_for_subject_predicate(id, sh::SEVERITY) {
        Some(TermRef::NamedNode(n)) if n == sh::WARNING => Severity::Warning,
        Some(TermRef::NamedNode(n)) if n == sh::INFO => Severity::Info,
        _ => Severity::Violation,
    }
}

fn message(graph: &Graph, id: SubjectRef<'_>) -> Option<String> {
    match graph.object_for_subject_predicate(id, sh::MESSAGE) {
        Some(TermRef::Literal(l)) => Some(l.value().to_string()),
        _ => None,
    }
}
