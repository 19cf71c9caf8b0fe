//! Typed relational records handed to the projector.
//!
//! Records are read after the relational write commits. Unknown fields are
//! rejected at deserialization time so loosely shaped payloads never reach
//! RDF serialization. Required string fields default to empty and are
//! reported by the projector as [`ValueError::MissingField`](crate::error::ValueError).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Lexical form used for `xsd:dateTime` values built from timestamps.
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// An issued/modified value as stored relationally.
///
/// Parsed timestamps are formatted as ISO-8601; text passes through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    At(NaiveDateTime),
    Text(String),
}

impl Timestamp {
    /// Lexical form for an `xsd:dateTime` literal.
    pub fn lexical(&self) -> String {
        match self {
            Timestamp::At(at) => at.format(DATE_TIME_FORMAT).to_string(),
            Timestamp::Text(text) => text.clone(),
        }
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(at: NaiveDateTime) -> Self {
        Timestamp::At(at)
    }
}

impl From<&str> for Timestamp {
    fn from(text: &str) -> Self {
        Timestamp::Text(text.to_string())
    }
}

/// A dataset row, keyed by its identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetRecord {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub issued: Option<Timestamp>,
    #[serde(default)]
    pub modified: Option<Timestamp>,
    /// Publisher name.
    #[serde(default)]
    pub publisher: String,
    /// Email-like contact string.
    #[serde(default)]
    pub contact_point: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub access_url_dataset: String,
    #[serde(default)]
    pub access_url_semantic_model: Option<String>,
    /// Media type of the distribution.
    #[serde(default)]
    pub file_format: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub webid: Option<String>,
    /// Supplementary RDF uploaded alongside the dataset.
    #[serde(default)]
    pub semantic_model_file: Option<String>,
    #[serde(default)]
    pub semantic_model_file_name: Option<String>,
    /// Key of the owning catalog.
    #[serde(default)]
    pub catalog: Option<String>,
}

/// A catalog row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogRecord {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub issued: Option<Timestamp>,
    #[serde(default)]
    pub modified: Option<Timestamp>,
    #[serde(default)]
    pub publisher: Option<String>,
}

/// Treat blank optional strings as absent.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
