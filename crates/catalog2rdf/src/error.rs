//! Error types for projection, validation, synchronization and loading.
//!
//! Input errors ([`ValueError`], [`ValidationError`]) are rejected before any
//! remote call. [`StoreError`]s never reach the caller of a relational write:
//! the sync layer turns them into failed steps of a report.

use thiserror::Error;

/// A dataset record that cannot be projected to RDF.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` is not a valid http(s) IRI ({value:?}): {reason}")]
    InvalidIri {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("identifier {value:?} does not form a valid dataset IRI: {reason}")]
    InvalidIdentifier { value: String, reason: String },
}

impl ValueError {
    /// Name of the offending record field.
    pub fn field(&self) -> &'static str {
        match self {
            ValueError::MissingField { field } | ValueError::InvalidIri { field, .. } => field,
            ValueError::InvalidIdentifier { .. } => "identifier",
        }
    }
}

/// Failure to parse RDF text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{format} syntax error: {message}")]
pub struct RdfParseError {
    pub format: &'static str,
    pub message: String,
}

/// Failure to write a graph as Turtle.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("invalid prefix IRI: {0}")]
    Prefix(#[from] oxiri::IriParseError),

    #[error("I/O error while serializing: {0}")]
    Io(#[from] std::io::Error),

    #[error("serializer produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Projection failed either on the input record or while serializing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

/// Conformance checking errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("candidate document is not valid Turtle: {0}")]
    Syntax(RdfParseError),

    #[error("document does not conform to the shape graph\n{report}")]
    NonConformant { report: String },

    #[error("shape graph could not be loaded: {0}")]
    Shapes(String),
}

/// Errors from a triple store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{operation} returned status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("invalid IRI {0:?}")]
    InvalidIri(String),

    #[error("HTTP client could not be built: {0}")]
    Client(String),

    #[error("store rejected {operation}: {reason}")]
    Rejected { operation: String, reason: String },
}

/// Errors loading a relational snapshot or drift journal from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that abort a bulk migration before any graph is rebuilt.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("could not read relational records: {0}")]
    Source(#[from] LoadError),

    #[error("could not prepare the triple store dataset: {0}")]
    Provision(#[source] StoreError),

    #[error("could not wipe the triple store: {0}")]
    Wipe(#[source] StoreError),
}

/// Errors surfaced to the HTTP layer from the core entry points.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("dataset identifier {0:?} already exists")]
    Conflict(String),
}

impl CoreError {
    /// Whether the error is the caller's fault (bad request or conflict).
    pub fn is_client_error(&self) -> bool {
        match self {
            CoreError::Value(_) | CoreError::Conflict(_) => true,
            CoreError::Validation(e) => !matches!(e, ValidationError::Shapes(_)),
            CoreError::Serialize(_) => false,
        }
    }
}

impl From<ProjectionError> for CoreError {
    fn from(e: ProjectionError) -> Self {
        match e {
            ProjectionError::Value(e) => CoreError::Value(e),
            ProjectionError::Serialize(e) => CoreError::Serialize(e),
        }
    }
}
