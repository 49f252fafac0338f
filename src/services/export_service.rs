use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;

/// Serializes result rows to CSV with a header taken from the field names.
/// Missing values are written as empty cells.
pub fn rows_to_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Failed to serialize row")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}
