//! Output module for persisting harvested records
//!
//! This module handles:
//! - The `Persistence` seam the coordinator writes through
//! - Structured (JSON) and tabular (CSV) artifact writers
//! - Artifact naming for checkpoints, final, interrupted and error outputs

mod csv;
mod json;
mod naming;
mod traits;

pub use self::csv::{tabular_headers, tabular_row, write_tabular};
pub use json::write_structured;
pub use naming::{run_timestamp, ArtifactNamer};
pub use traits::{OutputError, OutputResult, Persistence};

use crate::record::ItemRecord;
use std::path::Path;

/// Persistence backed by files on the local filesystem
///
/// Both operations create missing parent directories and overwrite the
/// target file completely.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilePersistence;

impl FilePersistence {
    /// Creates a new file persistence handler
    pub fn new() -> Self {
        Self
    }
}

impl Persistence for FilePersistence {
    fn write_structured(&self, records: &[ItemRecord], path: &Path) -> OutputResult<()> {
        ensure_parent(path)?;
        write_structured(records, path)?;
        tracing::info!("Saved {} records to {}", records.len(), path.display());
        Ok(())
    }

    fn write_tabular(&self, records: &[ItemRecord], path: &Path) -> OutputResult<()> {
        ensure_parent(path)?;
        write_tabular(records, path)?;
        tracing::info!("Saved {} records to {}", records.len(), path.display());
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
