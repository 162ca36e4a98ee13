//! Ingest pipeline: alert log -> normalized records -> cleaned dataset artifact

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::dataset::export_dataset;
use crate::log_reader::LogReader;
use crate::normalize::normalize;
use crate::types::{AlertRecord, CANONICAL_COLUMNS};

/// Outcome of one `clean` run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub rows: usize,
    pub dropped_lines: usize,
    pub pass_through_columns: Vec<String>,
    pub output: PathBuf,
}

/// Read and normalize every valid record of a log.
///
/// Returns the records in log order plus the number of dropped lines.
pub fn load_log(log_path: &Path) -> Result<(Vec<AlertRecord>, usize)> {
    let mut reader = LogReader::open(log_path)?;
    let mut records = Vec::new();

    for raw in reader.by_ref() {
        records.push(normalize(raw?));
    }

    Ok((records, reader.dropped()))
}

/// Run the full ingest: read, normalize and persist the cleaned dataset.
///
/// Nothing is written if the log cannot be read.
pub fn clean(log_path: &Path, output_path: &Path) -> Result<IngestSummary> {
    info!("Reading: {:?}", log_path);
    let (records, dropped_lines) = load_log(log_path)?;

    if dropped_lines > 0 {
        warn!("Dropped {} malformed lines from {:?}", dropped_lines, log_path);
    }
    if records.is_empty() {
        warn!("Alert log is empty or unreadable; writing header-only dataset");
    } else {
        info!("Loaded {} rows", records.len());
    }

    let header = export_dataset(&records, output_path)?;

    Ok(IngestSummary {
        rows: records.len(),
        dropped_lines,
        pass_through_columns: header[CANONICAL_COLUMNS.len()..].to_vec(),
        output: output_path.to_path_buf(),
    })
}
