//! Persistence trait and output error types
//!
//! The coordinator hands read-only snapshots of its collection to a
//! `Persistence` implementation at checkpoints and at the end of a run.

use crate::record::ItemRecord;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Sink for harvested records
///
/// Both operations are total overwrites of `path`, never appends.
pub trait Persistence {
    /// Writes the complete nested representation: one object per record,
    /// pyramid structure preserved, accords as a list
    fn write_structured(&self, records: &[ItemRecord], path: &Path) -> OutputResult<()>;

    /// Writes one flattened row per record; list and nested fields are
    /// serialized as strings
    fn write_tabular(&self, records: &[ItemRecord], path: &Path) -> OutputResult<()>;
}
