//! CSV export of per-tick control records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::runner::TickReport;

/// Column header for the history export.
const HEADER: &str = "time,tariff_active,charge_enabled,setpoint_pct,target_pct";

/// Exports collected tick records to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(reports: &[TickReport], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(reports, buf)
}

/// Writes tick records as CSV to any writer.
///
/// One row per tick; deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(reports: &[TickReport], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(','))?;

    for r in reports {
        wtr.write_record(&[
            r.now.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.tariff_active.to_string(),
            r.charge_enabled.to_string(),
            format!("{:.2}", r.setpoint_pct),
            format!("{:.2}", r.target_pct),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
