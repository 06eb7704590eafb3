//! CSV export of diagnosis results and history records.
//!
//! Column order is fixed: `timestamp, disease, confidence, left_image,
//! right_image`, plus `combined_image` for history exports. Values are quoted
//! as needed, so paths containing commas or quotes survive a round trip.

use crate::dialogs::{Dialogs, FileFilter};
use crate::error::Result;
use crate::model::{DiagnosisResult, HistoryRecord, PairDiagnosis, display_path, format_timestamp};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const BASE_HEADER: [&str; 5] = ["timestamp", "disease", "confidence", "left_image", "right_image"];
const COMBINED_HEADER: &str = "combined_image";

fn result_fields(result: &DiagnosisResult) -> [String; 3] {
    [
        format_timestamp(&result.diagnosed_at),
        result.disease.label().to_string(),
        result.confidence_percent(),
    ]
}

/// Write batch or single-pair results.
pub fn write_results_csv<W: Write>(rows: &[PairDiagnosis], out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(BASE_HEADER)?;
    for row in rows {
        let [ts, disease, confidence] = result_fields(&row.result);
        wtr.write_record([
            ts,
            disease,
            confidence,
            display_path(&row.pair.left.path),
            display_path(&row.pair.right.path),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write history records, including the combined image column.
pub fn write_history_csv<W: Write>(records: &[HistoryRecord], out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    let mut header = BASE_HEADER.to_vec();
    header.push(COMBINED_HEADER);
    wtr.write_record(&header)?;
    for rec in records {
        let [ts, disease, confidence] = result_fields(&rec.result);
        wtr.write_record([
            ts,
            disease,
            confidence,
            display_path(&rec.left_path),
            display_path(&rec.right_path),
            rec.combined_path
                .as_deref()
                .map(display_path)
                .unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_results_csv(rows: &[PairDiagnosis], path: impl AsRef<Path>) -> Result<()> {
    write_results_csv(rows, File::create(path.as_ref())?)
}

pub fn export_history_csv(records: &[HistoryRecord], path: impl AsRef<Path>) -> Result<()> {
    write_history_csv(records, File::create(path.as_ref())?)
}

/// Ask for a save location and write the export there.
///
/// Returns `Ok(None)` when the user cancels the dialog.
pub fn export_with_dialog(
    dialogs: &dyn Dialogs,
    default_name: &str,
    title: &str,
    write: impl FnOnce(&Path) -> Result<()>,
) -> Result<Option<PathBuf>> {
    let Some(path) = dialogs.pick_save_path(default_name, &[FileFilter::csv()], title) else {
        return Ok(None);
    };
    write(&path)?;
    tracing::info!("CSV exported to {}", path.display());
    Ok(Some(path))
}

/// `<prefix>_<YYYY-MM-DD>.csv` for today's date.
pub fn default_file_name(prefix: &str, today: DateTime<Local>) -> String {
    format!("{prefix}_{}.csv", today.format("%Y-%m-%d"))
}
