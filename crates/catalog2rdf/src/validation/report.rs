//! Validation reports.

use std::fmt::Write as _;

use oxrdf::{Subject, Term};

use super::shapes::{PropertyPath, Severity};

/// Outcome of validating one document against the shape graph.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// `true` when no result was produced, whatever its severity.
    pub conforms: bool,
    pub results: Vec<ValidationResult>,
}

/// One constraint a focus node failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub focus_node: Term,
    pub result_path: Option<PropertyPath>,
    pub value: Option<Term>,
    pub source_shape: Subject,
    /// Local name of the constraint component, e.g. `MinCountConstraintComponent`.
    pub source_constraint: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl ValidationReport {
    pub fn from_results(results: Vec<ValidationResult>) -> Self {
        Self {
            conforms: results.is_empty(),
            results,
        }
    }

    pub fn violation_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Violation)
            .count()
    }

    /// Results reported on `path`, in report order.
    pub fn results_for_path<'r>(
        &'r self,
        path: &'r PropertyPath,
    ) -> impl Iterator<Item = &'r ValidationResult> + 'r {
        self.results
            .iter()
            .filter(move |r| r.result_path.as_ref() == Some(path))
    }

    /// Render the report as text for API responses.
    pub fn text(&self) -> String {
        let mut out = String::from("Validation Report\n");
        let conforms = if self.conforms { "True" } else { "False" };
        let _ = writeln!(out, "Conforms: {conforms}");
        if self.results.is_empty() {
            return out;
        }
        let _ = writeln!(out, "Results ({}):", self.results.len());
        for result in &self.results {
            let kind = match result.severity {
                Severity::Violation => "Constraint Violation",
                Severity::Warning => "Constraint Warning",
                Severity::Info => "Constraint Info",
            };
            let _ = writeln!(out, "{kind} in {}:", result.source_constraint);
            let _ = writeln!(out, "\tSeverity: {}", result.severity);
            let _ = writeln!(out, "\tSource Shape: {}", result.source_shape);
            let _ = writeln!(out, "\tFocus Node: {}", result.focus_node);
            if let Some(value) = &result.value {
                let _ = writeln!(out, "\tValue Node: {value}");
            }
            if let Some(path) = &result.result_path {
                let _ = writeln!(out, "\tResult Path: {path}");
            }
            let _ = writeln!(out, "\tMessage: {}", result.message);
        }
        out
    }
}
