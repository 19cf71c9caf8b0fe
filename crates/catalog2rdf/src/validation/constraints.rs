//! SHACL constraint components and their validators.

use std::str::FromStr;

use oxrdf::vocab::{rdf, xsd};
use oxrdf::{Graph, NamedNode, NamedNodeRef, Term, TermRef, TripleRef};
use oxsdatatypes::{Boolean, Date, DateTime, Decimal, Double, Float, Integer};
use regex::Regex;

use super::shapes::{as_subject, NodeKind};

/// A compiled `sh:pattern` with its flags.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    pub flags: Option<String>,
    pub regex: Regex,
}

/// A constraint attached to a node or property shape.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// sh:minCount
    MinCount(usize),
    /// sh:maxCount
    MaxCount(usize),
    /// sh:datatype
    Datatype(NamedNode),
    /// sh:nodeKind
    NodeKind(NodeKind),
    /// sh:class
    Class(NamedNode),
    /// sh:pattern with optional sh:flags
    Pattern(Pattern),
    /// sh:minLength
    MinLength(usize),
    /// sh:maxLength
    MaxLength(usize),
    /// sh:in
    In(Vec<Term>),
    /// sh:hasValue
    HasValue(Term),
}

impl Constraint {
    /// Local name of the SHACL constraint component.
    pub fn component(&self) -> &'static str {
        match self {
            Constraint::MinCount(_) => "MinCountConstraintComponent",
            Constraint::MaxCount(_) => "MaxCountConstraintComponent",
            Constraint::Datatype(_) => "DatatypeConstraintComponent",
            Constraint::NodeKind(_) => "NodeKindConstraintComponent",
            Constraint::Class(_) => "ClassConstraintComponent",
            Constraint::Pattern(_) => "PatternConstraintComponent",
            Constraint::MinLength(_) => "MinLengthConstraintComponent",
            Constraint::MaxLength(_) => "MaxLengthConstraintComponent",
            Constraint::In(_) => "InConstraintComponent",
            Constraint::HasValue(_) => "HasValueConstraintComponent",
        }
    }

    /// Check the value nodes of one focus node against this constraint.
    ///
    /// `graph` is the data graph after inferencing; it is only consulted by
    /// `sh:class`.
    pub fn evaluate(&self, graph: &Graph, values: &[TermRef<'_>]) -> Vec<ConstraintViolation> {
        match self {
            Constraint::MinCount(min) => self.whole_set(validate_min_count(values.len(), *min)),
            Constraint::MaxCount(max) => self.whole_set(validate_max_count(values.len(), *max)),
            Constraint::HasValue(expected) => self.whole_set(validate_has_value(values, expected)),
            Constraint::Datatype(datatype) => {
                self.per_value(values, |v| validate_datatype(v, datatype.as_ref()))
            }
            Constraint::NodeKind(kind) => self.per_value(values, |v| validate_node_kind(v, *kind)),
            Constraint::Class(class) => {
                self.per_value(values, |v| validate_class(graph, v, class.as_ref()))
            }
            Constraint::Pattern(pattern) => self.per_value(values, |v| validate_pattern(v, pattern)),
            Constraint::MinLength(min) => self.per_value(values, |v| validate_min_length(v, *min)),
            Constraint::MaxLength(max) => self.per_value(values, |v| validate_max_length(v, *max)),
            Constraint::In(allowed) => self.per_value(values, |v| validate_in(v, allowed)),
        }
    }

    fn per_value(
        &self,
        values: &[TermRef<'_>],
        check: impl Fn(TermRef<'_>) -> Option<String>,
    ) -> Vec<ConstraintViolation> {
        values
            .iter()
            .filter_map(|value| {
                check(*value).map(|message| ConstraintViolation {
                    component: self.component(),
                    value: Some(value.into_owned()),
                    message,
                })
            })
            .collect()
    }

    fn whole_set(&self, message: Option<String>) -> Vec<ConstraintViolation> {
        message
            .map(|message| ConstraintViolation {
                component: self.component(),
                value: None,
                message,
            })
            .into_iter()
            .collect()
    }
}

/// A single failed constraint check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub component: &'static str,
    pub value: Option<Term>,
    pub message: String,
}

// ----------------------------------------------------------------------------
// Cardinality
// ----------------------------------------------------------------------------

pub fn validate_min_count(count: usize, min: usize) -> Option<String> {
    (count < min).then(|| format!("Expected at least {min} value(s) but found {count}"))
}

pub fn validate_max_count(count: usize, max: usize) -> Option<String> {
    (count > max).then(|| format!("Expected at most {max} value(s) but found {count}"))
}

// ----------------------------------------------------------------------------
// Value type
// ----------------------------------------------------------------------------

/// The literal must carry `datatype` and, for the XSD types we know, a
/// well-formed lexical form.
pub fn validate_datatype(value: TermRef<'_>, datatype: NamedNodeRef<'_>) -> Option<String> {
    let TermRef::Literal(literal) = value else {
        return Some(format!("Value {value} is not a literal with datatype {datatype}"));
    };
    if literal.datatype() != datatype {
        return Some(format!(
            "Value {value} has datatype {} but {datatype} is required",
            literal.datatype()
        ));
    }
    if !is_valid_lexical(literal.value(), datatype) {
        return Some(format!("Value {value} is not a valid {datatype} lexical form"));
    }
    None
}

fn is_valid_lexical(lexical: &str, datatype: NamedNodeRef<'_>) -> bool {
    match datatype {
        d if d == xsd::DATE_TIME => DateTime::from_str(lexical).is_ok(),
        d if d == xsd::DATE => Date::from_str(lexical).is_ok(),
        d if d == xsd::BOOLEAN => Boolean::from_str(lexical).is_ok(),
        d if d == xsd::INTEGER => Integer::from_str(lexical).is_ok(),
        d if d == xsd::DECIMAL => Decimal::from_str(lexical).is_ok(),
        d if d == xsd::DOUBLE => Double::from_str(lexical).is_ok(),
        d if d == xsd::FLOAT => Float::from_str(lexical).is_ok(),
        _ => true,
    }
}

pub fn validate_node_kind(value: TermRef<'_>, kind: NodeKind) -> Option<String> {
    (!kind.matches(value)).then(|| format!("Value {value} is not of node kind {kind}"))
}

/// The value must be typed `class`, directly or through inferred subclasses.
pub fn validate_class(graph: &Graph, value: TermRef<'_>, class: NamedNodeRef<'_>) -> Option<String> {
    let is_instance = as_subject(value)
        .is_some_and(|subject| graph.contains(TripleRef::new(subject, rdf::TYPE, class)));
    (!is_instance).then(|| format!("Value {value} is not an instance of {class}"))
}

// ----------------------------------------------------------------------------
// String based
// ----------------------------------------------------------------------------

/// String form used by pattern and length checks. Blank nodes have none.
fn string_form<'a>(value: TermRef<'a>) -> Option<&'a str> {
    match value {
        TermRef::NamedNode(node) => Some(node.as_str()),
        TermRef::Literal(literal) => Some(literal.value()),
        _ => None,
    }
}

pub fn validate_pattern(value: TermRef<'_>, pattern: &Pattern) -> Option<String> {
    match string_form(value) {
        Some(text) if pattern.regex.is_match(text) => None,
        Some(_) => Some(format!(
            "Value {value} does not match pattern {:?}",
            pattern.source
        )),
        None => Some(format!("Blank node {value} cannot match a pattern")),
    }
}

pub fn validate_min_length(value: TermRef<'_>, min: usize) -> Option<String> {
    match string_form(value).map(|s| s.chars().count()) {
        Some(len) if len >= min => None,
        Some(len) => Some(format!("String length {len} is less than minimum {min}")),
        None => Some(format!("Blank node {value} has no string length")),
    }
}

pub fn validate_max_length(value: TermRef<'_>, max: usize) -> Option<String> {
    match string_form(value).map(|s| s.chars().count()) {
        Some(len) if len <= max => None,
        Some(len) => Some(format!("String length {len} exceeds maximum {max}")),
        None => Some(format!("Blank node {value} has no string length")),
    }
}

// ----------------------------------------------------------------------------
// Value sets
// ----------------------------------------------------------------------------

pub fn validate_in(value: TermRef<'_>, allowed: &[Term]) -> Option<String> {
    if allowed.iter().any(|a| a.as_ref() == value) {
        return None;
    }
    let listed: Vec<String> = allowed.iter().map(ToString::to_string).collect();
    Some(format!("Value {value} is not one of [{}]", listed.join(", ")))
}

pub fn validate_has_value(values: &[TermRef<'_>], expected: &Term) -> Option<String> {
    (!values.iter().any(|v| *v == expected.as_ref()))
        .then(|| format!("Missing expected value {expected}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{BlankNode, Literal, NamedNodeRef};

    const EX: NamedNodeRef<'static> = NamedNodeRef::new_unchecked("http://example.org/x");

    #[test]
    fn cardinality_bounds() {
        assert!(validate_min_count(1, 1).is_none());
        assert!(validate_min_count(0, 1).unwrap().contains("at least 1"));
        assert!(validate_max_count(1, 1).is_none());
        assert!(validate_max_count(2, 1).unwrap().contains("at most 1"));
    }

    #[test]
    fn datatype_checks_lexical_form() {
        let good = Literal::new_typed_literal("2024-01-15T10:30:00", xsd::DATE_TIME);
        let bad = Literal::new_typed_literal("15/01/2024", xsd::DATE_TIME);
        let plain = Literal::new_simple_literal("2024-01-15T10:30:00");
        assert!(validate_datatype(good.as_ref().into(), xsd::DATE_TIME).is_none());
        assert!(validate_datatype(bad.as_ref().into(), xsd::DATE_TIME)
            .unwrap()
            .contains("lexical form"));
        assert!(validate_datatype(plain.as_ref().into(), xsd::DATE_TIME).is_some());
        assert!(validate_datatype(EX.into(), xsd::STRING).is_some());
    }

    #[test]
    fn plain_literals_are_strings() {
        let plain = Literal::new_simple_literal("hello");
        assert!(validate_datatype(plain.as_ref().into(), xsd::STRING).is_none());
    }

    #[test]
    fn node_kinds() {
        let literal = Literal::new_simple_literal("x");
        let blank = BlankNode::default();
        assert!(validate_node_kind(EX.into(), NodeKind::Iri).is_none());
        assert!(validate_node_kind(literal.as_ref().into(), NodeKind::Iri).is_some());
        assert!(validate_node_kind(literal.as_ref().into(), NodeKind::IriOrLiteral).is_none());
        assert!(validate_node_kind(blank.as_ref().into(), NodeKind::IriOrLiteral).is_some());
    }

    #[test]
    fn pattern_applies_to_iris_and_literals() {
        let pattern = Pattern {
            source: "^https?://".to_string(),
            flags: None,
            regex: Regex::new("^https?://").unwrap(),
        };
        assert!(validate_pattern(EX.into(), &pattern).is_none());
        let ftp = Literal::new_simple_literal("ftp://example.org");
        assert!(validate_pattern(ftp.as_ref().into(), &pattern).is_some());
        let blank = BlankNode::default();
        assert!(validate_pattern(blank.as_ref().into(), &pattern).is_some());
    }

    #[test]
    fn lengths_count_characters() {
        let word = Literal::new_simple_literal("héllo");
        assert!(validate_min_length(word.as_ref().into(), 5).is_none());
        assert!(validate_max_length(word.as_ref().into(), 5).is_none());
        assert!(validate_max_length(word.as_ref().into(), 4).is_some());
        let empty = Literal::new_simple_literal("");
        assert!(validate_min_length(empty.as_ref().into(), 1).is_some());
    }

    #[test]
    fn value_sets() {
        let allowed = vec![
            Term::from(Literal::new_simple_literal("public")),
            Term::from(Literal::new_simple_literal("restricted")),
        ];
        let public = Literal::new_simple_literal("public");
        let secret = Literal::new_simple_literal("secret");
        assert!(validate_in(public.as_ref().into(), &allowed).is_none());
        assert!(validate_in(secret.as_ref().into(), &allowed)
            .unwrap()
            .contains("\"secret\""));

        let values = [TermRef::from(public.as_ref())];
        assert!(validate_has_value(&values, &allowed[0]).is_none());
        assert!(validate_has_value(&values, &allowed[1]).is_some());
    }

    #[test]
    fn set_level_constraints_report_without_a_value() {
        let graph = Graph::new();
        let violations = Constraint::MinCount(1).evaluate(&graph, &[]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].component, "MinCountConstraintComponent");
        assert!(violations[0].value.is_none());
    }

    #[test]
    fn class_requires_a_type_triple() {
        let class = NamedNodeRef::new_unchecked("http://example.org/C");
        let mut graph = Graph::new();
        assert!(validate_class(&graph, EX.into(), class).is_some());
        graph.insert(TripleRef::new(EX, rdf::TYPE, class));
        assert!(validate_class(&graph, EX.into(), class).is_none());
    }
}
