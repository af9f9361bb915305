//! Destinations for parsed records.
//!
//! A sink accepts bulk and single-row inserts and reports each attempt as
//! one of three outcomes. Transport failures are the only `Err`.

pub mod rest;

pub use rest::RestSink;

use crate::record::Record;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Encode error: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::Encode(err.to_string())
    }
}

/// Classified result of one insert call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Duplicate key; the row already exists
    Conflict,
    Rejected { status: u16, body: String },
}

impl InsertOutcome {
    /// Classify an HTTP status code and response body.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            200..=299 => InsertOutcome::Inserted,
            409 => InsertOutcome::Conflict,
            _ => InsertOutcome::Rejected {
                status,
                body: body.into(),
            },
        }
    }

    /// Inserted, or already present
    pub fn is_settled(&self) -> bool {
        matches!(self, InsertOutcome::Inserted | InsertOutcome::Conflict)
    }
}

/// A tabular destination that records can be inserted into.
pub trait Sink {
    /// Insert all `records` into `table` in a single call.
    fn insert_many(&mut self, table: &str, records: &[Record]) -> Result<InsertOutcome, SinkError>;

    /// Insert one record into `table`.
    fn insert_one(&mut self, table: &str, record: &Record) -> Result<InsertOutcome, SinkError>;
}
