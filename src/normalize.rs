//! Field normalization: raw log records to canonical `AlertRecord`s
//!
//! Normalization is total. Every unparseable value maps to a sentinel:
//! - `signal_score` falls back to 0.0
//! - `rsi_15m` / `heat_index` fall back to `None`
//! - `timestamp` falls back to `None`
//! - `alert_sent` falls back to `false`

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::types::{
    AlertRecord, RawRecord, CANONICAL_COLUMNS, COL_ALERT_SENT, COL_HEAT_INDEX, COL_RSI_15M,
    COL_SIGNAL_SCORE, COL_SYMBOL, COL_TIMESTAMP,
};

/// String spellings that count as a sent alert (case-sensitive set)
const ALERT_SENT_TRUE: [&str; 3] = ["True", "true", "TRUE"];

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Normalize one raw record. Never fails.
pub fn normalize(mut raw: RawRecord) -> AlertRecord {
    let timestamp = raw.get(COL_TIMESTAMP).and_then(parse_timestamp);
    let symbol = raw.get(COL_SYMBOL).map(parse_symbol).unwrap_or_default();
    let signal_score = raw.get(COL_SIGNAL_SCORE).and_then(parse_number).unwrap_or(0.0);
    let rsi_15m = raw.get(COL_RSI_15M).and_then(parse_number);
    let heat_index = raw.get(COL_HEAT_INDEX).and_then(parse_number);
    let alert_sent = raw.get(COL_ALERT_SENT).map_or(false, parse_alert_sent);

    for col in CANONICAL_COLUMNS {
        raw.remove(col);
    }

    AlertRecord {
        timestamp,
        symbol,
        signal_score,
        rsi_15m,
        heat_index,
        alert_sent,
        extra: raw,
    }
}

/// Parse a finite float from a JSON number or numeric string
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Parse a timestamp: RFC 3339 first, then naive date-times and plain dates as UTC
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn parse_alert_sent(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => ALERT_SENT_TRUE.contains(&s.as_str()),
        _ => false,
    }
}

fn parse_symbol(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
