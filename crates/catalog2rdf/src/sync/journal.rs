//! Durable record of failed synchronization steps.
//!
//! One JSON object per line. Entries are only informational: the bulk
//! migration repairs the drift they describe and clears the journal.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StepKind, SyncAction};
use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftEntry {
    pub at: DateTime<Utc>,
    pub action: SyncAction,
    /// Identifier the write was about (the new one for renames).
    pub identifier: String,
    pub step: StepKind,
    /// Graph or dataset IRI the failed step targeted.
    pub target: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct DriftJournal {
    path: PathBuf,
}

impl DriftJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file if needed.
    pub fn record(&self, entry: &DriftEntry) -> Result<(), LoadError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// All entries in the order they were recorded. A missing file is empty.
    pub fn entries(&self) -> Result<Vec<DriftEntry>, LoadError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(LoadError::from))
            .collect()
    }

    pub fn clear(&self) -> Result<(), LoadError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identifier: &str) -> DriftEntry {
        DriftEntry {
            at: Utc::now(),
            action: SyncAction::Deleted,
            identifier: identifier.to_string(),
            step: StepKind::Retract,
            target: format!("https://example.org/id/{identifier}"),
            error: "request timed out".to_string(),
        }
    }

    #[test]
    fn entries_round_trip_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let journal = DriftJournal::new(dir.path().join("drift.jsonl"));
        assert!(journal.entries().unwrap().is_empty());

        journal.record(&entry("a")).unwrap();
        journal.record(&entry("b")).unwrap();
        let ids: Vec<_> = journal
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.identifier)
            .collect();
        assert_eq!(ids, ["a", "b"]);

        journal.clear().unwrap();
        journal.clear().unwrap();
        assert!(journal.entries().unwrap().is_empty());
    }

    #[test]
    fn steps_serialize_in_snake_case() {
        let json = serde_json::to_string(&entry("a")).unwrap();
        assert!(json.contains("\"step\":\"retract\""), "{json}");
        assert!(json.contains("\"action\":\"deleted\""), "{json}");
    }
}
