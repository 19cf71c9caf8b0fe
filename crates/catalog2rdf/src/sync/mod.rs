//! Best-effort propagation of relational writes to the triple store.
//!
//! Runs after the relational commit. Store failures never fail the caller's
//! write: each remote step is recorded in a [`SyncReport`], failures are
//! logged and journaled, and the bulk migration is the repair path.

pub mod journal;

use std::fmt;
use std::future::Future;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::model::iri::IriMinter;
use crate::projection::ProjectedDataset;
use crate::store::GraphStore;

pub use journal::{DriftEntry, DriftJournal};

/// The relational write that triggered synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Publish,
    Retract,
    AddMembership,
    RemoveMembership,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Publish => "publish",
            StepKind::Retract => "retract",
            StepKind::AddMembership => "add membership",
            StepKind::RemoveMembership => "remove membership",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    Failed(String),
}

/// One remote operation and how it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStep {
    pub kind: StepKind,
    /// Graph IRI (publish/retract) or dataset IRI (membership).
    pub target: String,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub action: SyncAction,
    pub identifier: String,
    pub steps: Vec<SyncStep>,
}

impl SyncReport {
    fn new(action: SyncAction, identifier: &str) -> Self {
        Self {
            action,
            identifier: identifier.to_string(),
            steps: Vec::new(),
        }
    }

    /// Whether every attempted step was applied.
    pub fn is_consistent(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncStep> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, SyncOutcome::Failed(_)))
    }
}

/// Applies dataset lifecycle events to a [`GraphStore`].
#[derive(Debug)]
pub struct DatasetSync<S> {
    store: S,
    iris: IriMinter,
    journal: Option<DriftJournal>,
}

impl<S: GraphStore> DatasetSync<S> {
    pub fn new(store: S, iris: IriMinter) -> Self {
        Self {
            store,
            iris,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: DriftJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn journal(&self) -> Option<&DriftJournal> {
        self.journal.as_ref()
    }

    /// Publish the new dataset graph, then list it in the catalog.
    ///
    /// Membership is not attempted when the publish failed.
    pub async fn created(&self, doc: &ProjectedDataset) -> SyncReport {
        let mut report = SyncReport::new(SyncAction::Created, &doc.identifier);
        let iri = &doc.dataset_iri;
        let published = self
            .step(&mut report, StepKind::Publish, iri, self.store.publish(iri, &doc.turtle))
            .await;
        if published {
            self.step(&mut report, StepKind::AddMembership, iri, self.store.add_membership(iri))
                .await;
        }
        self.finish(report)
    }

    /// Replace the dataset graph; on rename also move the graph and the
    /// catalog membership from the old IRI to the new one.
    ///
    /// The new graph is published even when retracting the old one failed.
    pub async fn updated(&self, previous_identifier: &str, doc: &ProjectedDataset) -> SyncReport {
        let mut report = SyncReport::new(SyncAction::Updated, &doc.identifier);
        let iri = &doc.dataset_iri;

        if previous_identifier == doc.identifier {
            self.step(&mut report, StepKind::Publish, iri, self.store.publish(iri, &doc.turtle))
                .await;
            return self.finish(report);
        }

        let old = self.iris.dataset_iri(previous_identifier);
        self.step(&mut report, StepKind::Retract, &old, self.store.retract(&old))
            .await;
        let published = self
            .step(&mut report, StepKind::Publish, iri, self.store.publish(iri, &doc.turtle))
            .await;
        self.step(
            &mut report,
            StepKind::RemoveMembership,
            &old,
            self.store.remove_membership(&old),
        )
        .await;
        if published {
            self.step(&mut report, StepKind::AddMembership, iri, self.store.add_membership(iri))
                .await;
        }
        self.finish(report)
    }

    /// Drop the dataset graph and its membership. Both are attempted even
    /// if one fails.
    pub async fn deleted(&self, identifier: &str) -> SyncReport {
        let mut report = SyncReport::new(SyncAction::Deleted, identifier);
        let iri = self.iris.dataset_iri(identifier);
        self.step(&mut report, StepKind::Retract, &iri, self.store.retract(&iri))
            .await;
        self.step(
            &mut report,
            StepKind::RemoveMembership,
            &iri,
            self.store.remove_membership(&iri),
        )
        .await;
        self.finish(report)
    }

    /// Await one remote operation and record its outcome. Returns whether it
    /// was applied.
    async fn step(
        &self,
        report: &mut SyncReport,
        kind: StepKind,
        target: &str,
        operation: impl Future<Output = Result<(), StoreError>>,
    ) -> bool {
        let outcome = match operation.await {
            Ok(()) => {
                debug!(step = %kind, iri = target, "triple store step applied");
                SyncOutcome::Applied
            }
            Err(e) => {
                warn!(
                    action = ?report.action,
                    identifier = %report.identifier,
                    step = %kind,
                    iri = target,
                    error = %e,
                    "triple store step failed; graph will stay stale until the next bulk migration"
                );
                self.journal_failure(report, kind, target, &e);
                SyncOutcome::Failed(e.to_string())
            }
        };
        let applied = outcome == SyncOutcome::Applied;
        report.steps.push(SyncStep {
            kind,
            target: target.to_string(),
            outcome,
        });
        applied
    }

    fn journal_failure(&self, report: &SyncReport, kind: StepKind, target: &str, error: &StoreError) {
        let Some(journal) = &self.journal else {
            return;
        };
        let entry = DriftEntry {
            at: Utc::now(),
            action: report.action,
            identifier: report.identifier.clone(),
            step: kind,
            target: target.to_string(),
            error: error.to_string(),
        };
        if let Err(e) = journal.record(&entry) {
            warn!(path = %journal.path().display(), error = %e, "could not append to drift journal");
        }
    }

    fn finish(&self, report: SyncReport) -> SyncReport {
        debug!(
            action = ?report.action,
            identifier = %report.identifier,
            steps = report.steps.len(),
            consistent = report.is_consistent(),
            "synchronization finished"
        );
        report
    }
}
