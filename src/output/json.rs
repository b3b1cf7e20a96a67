//! Structured (JSON) artifact writer

use crate::output::traits::OutputResult;
use crate::record::ItemRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes records as a pretty-printed JSON array
///
/// Non-ASCII text is written as UTF-8 rather than escaped.
pub fn write_structured(records: &[ItemRecord], path: &Path) -> OutputResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
