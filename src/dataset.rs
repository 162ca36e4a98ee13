//! Cleaned dataset artifact (CSV)
//!
//! Header: canonical columns in fixed order, then pass-through columns in
//! first-seen order. Booleans are `True`/`False`, missing values are empty.
//! Pass-through cells are JSON, except strings that JSON would misread, which
//! are written raw.

use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::normalize::normalize;
use crate::types::{AlertRecord, RawRecord, CANONICAL_COLUMNS};

/// Header for a dataset: canonical columns, then every pass-through key in first-seen order
pub fn header_for(records: &[AlertRecord]) -> Vec<String> {
    let mut header: Vec<String> = CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();
    for record in records {
        for key in record.extra.keys() {
            if !header.iter().any(|h| h == key) {
                header.push(key.clone());
            }
        }
    }
    header
}

/// Write the dataset as CSV to any writer
pub fn write_dataset<W: Write>(records: &[AlertRecord], writer: W) -> Result<Vec<String>> {
    let header = header_for(records);
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(&header)?;
    for record in records {
        csv_writer.write_record(record_to_row(record, &header[CANONICAL_COLUMNS.len()..]))?;
    }
    csv_writer.flush()?;

    Ok(header)
}

/// Persist the dataset, replacing any previous artifact at `path`.
///
/// Rows are written to a sibling temp file and renamed into place, so a reader
/// sees either the old artifact or the complete new one.
pub fn export_dataset(records: &[AlertRecord], path: &Path) -> Result<Vec<String>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }

    let tmp_path = temp_path_for(path);
    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp artifact: {:?}", tmp_path))?;

    let header = match write_dataset(records, file) {
        Ok(header) => header,
        Err(e) => {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e).with_context(|| format!("Failed to write dataset to {:?}", tmp_path));
        }
    };

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e)
            .with_context(|| format!("Failed to move {:?} into place at {:?}", tmp_path, path));
    }

    info!("Saved {} rows ({} columns) to {:?}", records.len(), header.len(), path);
    Ok(header)
}

/// Read a dataset artifact and re-normalize every row
pub fn import_dataset(path: &Path) -> Result<Vec<AlertRecord>> {
    if !path.exists() {
        bail!("Cleaned dataset not found: {:?}", path);
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open cleaned dataset: {:?}", path))?;

    let records = read_dataset(BufReader::new(file))
        .with_context(|| format!("Failed to parse cleaned dataset: {:?}", path))?;

    debug!("Loaded {} rows from {:?}", records.len(), path);
    Ok(records)
}

/// Parse CSV rows back into normalized records
pub fn read_dataset<R: Read>(reader: R) -> Result<Vec<AlertRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let header: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to parse CSV row {}", i + 1))?;
        records.push(normalize(row_to_raw(&header, &row)));
    }
    Ok(records)
}

fn record_to_row(record: &AlertRecord, pass_through: &[String]) -> Vec<String> {
    let mut row = Vec::with_capacity(CANONICAL_COLUMNS.len() + pass_through.len());

    row.push(
        record
            .timestamp
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            .unwrap_or_default(),
    );
    row.push(record.symbol.clone());
    row.push(record.signal_score.to_string());
    row.push(record.rsi_15m.map(|v| v.to_string()).unwrap_or_default());
    row.push(record.heat_index.map(|v| v.to_string()).unwrap_or_default());
    row.push(if record.alert_sent { "True" } else { "False" }.to_string());

    for key in pass_through {
        row.push(match record.extra.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) if !s.is_empty() && !parses_as_json(s) => s.clone(),
            Some(other) => other.to_string(),
        });
    }

    row
}

fn row_to_raw(header: &[String], row: &csv::StringRecord) -> RawRecord {
    let mut raw = RawRecord::new();
    for (i, cell) in row.iter().enumerate() {
        let Some(key) = header.get(i) else {
            continue;
        };
        if cell.is_empty() {
            continue;
        }
        let is_canonical = CANONICAL_COLUMNS.contains(&key.as_str());
        raw.insert(key.clone(), cell_value(cell, is_canonical));
    }
    raw
}

/// Pass-through cells decode as JSON when they parse, otherwise as raw strings
fn cell_value(cell: &str, is_canonical: bool) -> Value {
    if !is_canonical {
        if let Ok(value) = serde_json::from_str::<Value>(cell) {
            return value;
        }
    }
    Value::String(cell.to_string())
}

fn parses_as_json(s: &str) -> bool {
    serde_json::from_str::<Value>(s).is_ok()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "dataset.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record(symbol: &str, score: f64, sent: bool, extra: Value) -> AlertRecord {
        AlertRecord {
            timestamp: Some(Utc.with_ymd_and_hms(2025, 11, 2, 14, 30, 0).unwrap()),
            symbol: symbol.to_string(),
            signal_score: score,
            rsi_15m: Some(64.5),
            heat_index: None,
            alert_sent: sent,
            extra: extra.as_object().cloned().unwrap_or_default(),
        }
    }

    fn write_to_string(records: &[AlertRecord]) -> String {
        let mut out = Vec::new();
        write_dataset(records, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_and_formatting() {
        let text = write_to_string(&[record("BTC", 3.0, true, json!({}))]);
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp,symbol,signal_score,rsi_15m,heat_index,alert_sent")
        );
        assert_eq!(lines.next(), Some("2025-11-02T14:30:00Z,BTC,3,64.5,,True"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_dataset_writes_header_only() {
        let text = write_to_string(&[]);
        assert_eq!(text.trim_end(), CANONICAL_COLUMNS.join(","));
    }

    #[test]
    fn test_pass_through_columns_first_seen_order() {
        let records = vec![
            record("BTC", 1.0, false, json!({"rejected": ["spread"]})),
            record("ETH", 2.0, true, json!({"context": {"macd_alignment": "bullish"}, "note": "x"})),
        ];
        let header = header_for(&records);
        assert_eq!(&header[6..], &["rejected", "context", "note"]);

        let text = write_to_string(&records);
        let row = text.lines().nth(1).unwrap();
        assert!(row.ends_with(",\"[\"\"spread\"\"]\",,"));
    }

    #[test]
    fn test_round_trip_keeps_values() {
        let mut missing_ts = record("", 0.0, false, json!({"rejected": ["low_volume", "rsi"]}));
        missing_ts.timestamp = None;
        missing_ts.rsi_15m = None;
        let original = vec![
            record("BTC", 1.25, true, json!({"context": {"macd_alignment": "bullish"}})),
            missing_ts,
            record("ETH", -0.5, false, json!({"note": "plain text"})),
        ];

        let mut out = Vec::new();
        write_dataset(&original, &mut out).unwrap();
        let reloaded = read_dataset(out.as_slice()).unwrap();

        assert_eq!(reloaded.len(), original.len());
        for (a, b) in original.iter().zip(&reloaded) {
            assert_eq!(a.symbol, b.symbol);
            assert_eq!(a.alert_sent, b.alert_sent);
            assert_eq!(a.signal_score, b.signal_score);
            assert_eq!(a.rsi_15m, b.rsi_15m);
            assert_eq!(a.heat_index, b.heat_index);
            assert_eq!(a.timestamp, b.timestamp);
        }
        assert_eq!(reloaded[0].macd_alignment().as_deref(), Some("bullish"));
        assert_eq!(
            reloaded[1].rejection_reasons(),
            Some(vec!["low_volume".to_string(), "rsi".to_string()])
        );
        assert!(!reloaded[0].is_rejected());
        assert_eq!(reloaded[2].extra["note"], json!("plain text"));
    }

    #[test]
    fn test_export_overwrites_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cleaned.csv");

        export_dataset(&[record("BTC", 1.0, true, json!({})), record("ETH", 2.0, true, json!({}))], &path)
            .unwrap();
        export_dataset(&[record("SOL", 5.0, false, json!({}))], &path).unwrap();

        let reloaded = import_dataset(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].symbol, "SOL");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_pass_through_types_survive_round_trip() {
        let original = vec![
            record("BTC", 1.0, false, json!({"note": "[1,2]", "rejected": ""})),
            record("ETH", 2.0, true, json!({"note": "42", "count": 42, "flag": true, "quote": "\"hi\""})),
            record("SOL", 3.0, true, json!({"note": "plain", "rejected": []})),
        ];

        let mut out = Vec::new();
        write_dataset(&original, &mut out).unwrap();
        let reloaded = read_dataset(out.as_slice()).unwrap();

        for (a, b) in original.iter().zip(&reloaded) {
            assert_eq!(a.extra, b.extra);
        }
        assert_eq!(reloaded[0].extra["note"], json!("[1,2]"));
        assert!(reloaded[0].is_rejected());
        assert_eq!(reloaded[0].rejection_reasons(), Some(vec![String::new()]));
        assert_eq!(reloaded[1].extra["count"], json!(42));
        assert!(reloaded[2].is_rejected());
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.csv");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let err = export_dataset(&[record("BTC", 1.0, true, json!({}))], &path).unwrap_err();
        assert!(err.to_string().contains("into place"));
        assert!(!temp_path_for(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_import_missing_artifact() {
        let err = import_dataset(Path::new("no/such/cleaned.csv")).unwrap_err();
        assert!(err.to_string().contains("Cleaned dataset not found"));
    }
}
