use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One parsed log line before normalization
pub type RawRecord = Map<String, Value>;

pub const COL_TIMESTAMP: &str = "timestamp";
pub const COL_SYMBOL: &str = "symbol";
pub const COL_SIGNAL_SCORE: &str = "signal_score";
pub const COL_RSI_15M: &str = "rsi_15m";
pub const COL_HEAT_INDEX: &str = "heat_index";
pub const COL_ALERT_SENT: &str = "alert_sent";

/// Canonical artifact columns, in header order
pub const CANONICAL_COLUMNS: [&str; 6] = [
    COL_TIMESTAMP,
    COL_SYMBOL,
    COL_SIGNAL_SCORE,
    COL_RSI_15M,
    COL_HEAT_INDEX,
    COL_ALERT_SENT,
];

/// Normalized alert event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: Option<DateTime<Utc>>,
    /// Empty string when the log line had no usable symbol
    pub symbol: String,
    /// Missing or unparseable scores are stored as 0.0
    pub signal_score: f64,
    pub rsi_15m: Option<f64>,
    pub heat_index: Option<f64>,
    pub alert_sent: bool,
    /// Non-canonical keys, carried through unchanged
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl AlertRecord {
    /// Rejection reasons from the pass-through `rejected` field.
    ///
    /// `None` when the field is absent or null. A single string counts as one reason.
    pub fn rejection_reasons(&self) -> Option<Vec<String>> {
        match self.extra.get("rejected")? {
            Value::Null => None,
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(value_label)
                    .collect(),
            ),
            other => Some(vec![value_label(other)]),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection_reasons().is_some()
    }

    /// `context.macd_alignment`, if the record carries one
    pub fn macd_alignment(&self) -> Option<String> {
        match self.extra.get("context")?.get("macd_alignment")? {
            Value::Null => None,
            v => Some(value_label(v)),
        }
    }
}

/// Render a JSON value as a label: strings verbatim, everything else as compact JSON
pub fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Externally produced momentum progress summary, passed through to the report as-is.
///
/// Values are not type-checked; keys beyond the four known ones are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentumSummary {
    #[serde(default)]
    pub total_cycles: Option<Value>,
    #[serde(default)]
    pub success_total: Option<Value>,
    #[serde(default)]
    pub failures: Option<Value>,
    #[serde(default)]
    pub still_active: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
