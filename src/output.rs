//! Output formatting for pipeline snapshots.
//!
//! Supports pretty-printing, JSON serialization, and CSV export of the
//! filtered records.

use std::io::Write;

use anyhow::Result;
use csv::WriterBuilder;
use tracing::debug;

use crate::models::{CSV_COLUMNS, EnrichedRecord};
use crate::pipeline::LiveSnapshot;

/// Writes a snapshot using Rust's debug pretty-print format.
pub fn print_pretty<W: Write>(mut writer: W, snapshot: &LiveSnapshot) -> Result<()> {
    writeln!(writer, "{snapshot:#?}")?;
    Ok(())
}

/// Writes a snapshot as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(mut writer: W, snapshot: &LiveSnapshot) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writeln!(writer)?;
    Ok(())
}

/// Writes `records` as CSV, one header row then one row per record.
///
/// The header is written even when there are no records.
pub fn write_csv<W: Write>(writer: W, records: &[EnrichedRecord]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);

    if records.is_empty() {
        writer.write_record(CSV_COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    debug!(rows = records.len(), "Wrote CSV records");
    Ok(())
}
