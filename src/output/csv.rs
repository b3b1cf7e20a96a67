//! Tabular (CSV) artifact writer

use crate::output::traits::OutputResult;
use crate::record::ItemRecord;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const SEPARATOR: char = ',';

/// Column names of the tabular artifact, in order
pub fn tabular_headers() -> Vec<String> {
    [
        "url",
        "brand",
        "name",
        "gender_from_title",
        "accords",
        "rating",
        "scent_pyramid",
        "longevity",
        "year",
        "gender",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect()
}

/// Flattens one record into a row matching `tabular_headers`
///
/// Accords and the pyramid are serialized as compact JSON; absent values
/// become empty cells.
pub fn tabular_row(record: &ItemRecord) -> OutputResult<Vec<String>> {
    Ok(vec![
        record.url.clone(),
        record.brand.clone().unwrap_or_default(),
        record.name.clone(),
        record.gender_from_title.clone(),
        serde_json::to_string(&record.accords)?,
        record.rating.map(|r| r.to_string()).unwrap_or_default(),
        serde_json::to_string(&record.scent_pyramid)?,
        record.longevity.clone().unwrap_or_default(),
        record.year.clone().unwrap_or_default(),
        record.gender.clone().unwrap_or_default(),
    ])
}

/// Writes records as CSV with a header row
pub fn write_tabular(records: &[ItemRecord], path: &Path) -> OutputResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write_row(&mut writer, &tabular_headers())?;
    for record in records {
        write_row(&mut writer, &tabular_row(record)?)?;
    }

    writer.flush()?;
    Ok(())
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(w: &mut W, row: &[String]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", SEPARATOR)?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}
