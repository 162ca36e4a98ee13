//! Descriptive statistics over numeric columns of the cleaned dataset

use serde::{Deserialize, Serialize};

use crate::types::AlertRecord;

/// Numeric columns that can be summarized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericColumn {
    SignalScore,
    Rsi15m,
    HeatIndex,
}

impl NumericColumn {
    /// Column value, `None` for null sentinels
    pub fn value(&self, record: &AlertRecord) -> Option<f64> {
        match self {
            NumericColumn::SignalScore => Some(record.signal_score),
            NumericColumn::Rsi15m => record.rsi_15m,
            NumericColumn::HeatIndex => record.heat_index,
        }
    }
}

/// Record selection for a statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subset {
    All,
    AlertsOnly,
    /// Records carrying a non-null `rejected` field
    Rejected,
}

impl Subset {
    pub fn contains(&self, record: &AlertRecord) -> bool {
        match self {
            Subset::All => true,
            Subset::AlertsOnly => record.alert_sent,
            Subset::Rejected => record.is_rejected(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation; `None` below two values
    pub std: Option<f64>,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
}

/// Result of summarizing a column over a subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Summary {
    /// No non-null values in the subset
    NotApplicable,
    Available(SummaryStats),
}

impl Summary {
    pub fn stats(&self) -> Option<&SummaryStats> {
        match self {
            Summary::NotApplicable => None,
            Summary::Available(stats) => Some(stats),
        }
    }
}

/// Summarize the non-null values of `column` within `subset`
pub fn describe(records: &[AlertRecord], column: NumericColumn, subset: Subset) -> Summary {
    let values: Vec<f64> = records
        .iter()
        .filter(|r| subset.contains(r))
        .filter_map(|r| column.value(r))
        .collect();
    describe_values(values)
}

pub fn describe_values(mut values: Vec<f64>) -> Summary {
    let Some(mean) = mean(&values) else {
        return Summary::NotApplicable;
    };

    values.sort_by(f64::total_cmp);
    let count = values.len();
    let std = (count > 1).then(|| sample_std(&values, mean));

    Summary::Available(SummaryStats {
        count,
        mean,
        min: values[0],
        max: values[count - 1],
        std,
        p25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        p75: quantile(&values, 0.75),
    })
}

/// Arithmetic mean of finite values, `None` when empty.
///
/// Stays finite for values near `f64::MAX`: an overflowing sum is redone on
/// values scaled by the largest magnitude.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;

    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        return Some(sum / n);
    }

    let scale = max_magnitude(values);
    Some(values.iter().map(|v| v / scale).sum::<f64>() / n * scale)
}

/// Sample standard deviation (n - 1) around a known mean; needs two or more values
fn sample_std(values: &[f64], mean: f64) -> f64 {
    let denom = (values.len() - 1) as f64;

    let sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if sq.is_finite() {
        return (sq / denom).sqrt();
    }

    let scale = max_magnitude(values);
    let scaled_mean = mean / scale;
    let sq: f64 = values.iter().map(|v| (v / scale - scaled_mean).powi(2)).sum();
    (sq / denom).sqrt() * scale
}

fn max_magnitude(values: &[f64]) -> f64 {
    values.iter().fold(0.0f64, |m, v| m.max(v.abs()))
}

/// Linear-interpolated quantile of sorted, non-empty values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
