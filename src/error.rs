//! Typed errors for the planner core.

use thiserror::Error;

/// Input rejected before any mutation took place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{field} must be HH:MM (00:00 - 23:59), got {value:?}")]
    InvalidTime { field: &'static str, value: String },
    #[error("{field} must be a valid DD/MM/YYYY date, got {value:?}")]
    InvalidDate { field: &'static str, value: String },
    #[error("start time {start} must be before end time {end}")]
    TimeOrder { start: String, end: String },
    #[error("start date {start} must be before end date {end}")]
    DateOrder { start: String, end: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field)
            | Self::InvalidTime { field, .. }
            | Self::InvalidDate { field, .. } => field,
            Self::TimeOrder { .. } => "endTime",
            Self::DateOrder { .. } => "endDate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no {kind} with id {id}")]
    UnknownId { kind: &'static str, id: String },
}

/// Storage read or write failure. Logged, never fatal.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error on slot {slot}: {source}")]
    Io {
        slot: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize slot {slot}: {source}")]
    Serialize {
        slot: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse slot {slot}: {source}")]
    Deserialize {
        slot: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Document generation or hand-off failure.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("sharing failed: {0}")]
    Share(String),
}
