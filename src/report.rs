//! Tracker report: everything the presentation layer renders, computed up front

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::aggregate::{
    alerts_by_hour, macd_alignment_counts, rejection_reason_counts, top_symbols,
    weakest_symbols, HourCount, LabelCount, Ranking,
};
use crate::config::TrackerConfig;
use crate::stats::{describe, NumericColumn, Subset, Summary};
use crate::types::{value_label, AlertRecord, MomentumSummary};

/// What the loaded dataset contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
    /// Artifact has no rows
    Empty,
    /// Rows present, none with a sent alert
    NoAlerts,
    Loaded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerReport {
    pub status: DatasetStatus,
    pub total_entries: usize,
    pub total_alerts: usize,

    pub score_all: Summary,
    pub score_alerts: Summary,
    pub rsi_all: Summary,
    pub rsi_alerts: Summary,
    pub rsi_rejected: Summary,
    pub heat_all: Summary,

    pub top_symbols: Ranking,
    pub weakest_symbols: Ranking,
    /// Weakest symbols over every record, alerts sent or not
    pub weakest_symbols_all: Ranking,

    pub macd_alignment: Vec<LabelCount>,
    pub rejection_reasons: Vec<LabelCount>,
    pub alerts_by_hour: Vec<HourCount>,

    pub momentum: Option<MomentumSummary>,
}

/// Compute the full report over a cleaned dataset
pub fn build_report(
    records: &[AlertRecord],
    config: &TrackerConfig,
    momentum: Option<MomentumSummary>,
) -> TrackerReport {
    let total_alerts = records.iter().filter(|r| r.alert_sent).count();
    let status = if records.is_empty() {
        DatasetStatus::Empty
    } else if total_alerts == 0 {
        DatasetStatus::NoAlerts
    } else {
        DatasetStatus::Loaded
    };

    TrackerReport {
        status,
        total_entries: records.len(),
        total_alerts,
        score_all: describe(records, NumericColumn::SignalScore, Subset::All),
        score_alerts: describe(records, NumericColumn::SignalScore, Subset::AlertsOnly),
        rsi_all: describe(records, NumericColumn::Rsi15m, Subset::All),
        rsi_alerts: describe(records, NumericColumn::Rsi15m, Subset::AlertsOnly),
        rsi_rejected: describe(records, NumericColumn::Rsi15m, Subset::Rejected),
        heat_all: describe(records, NumericColumn::HeatIndex, Subset::All),
        top_symbols: top_symbols(records, config.top_n),
        weakest_symbols: weakest_symbols(records, Subset::AlertsOnly, config.bottom_n),
        weakest_symbols_all: weakest_symbols(records, Subset::All, config.bottom_n),
        macd_alignment: macd_alignment_counts(records),
        rejection_reasons: rejection_reason_counts(records, config.reason_limit),
        alerts_by_hour: alerts_by_hour(records),
        momentum,
    }
}

/// Load the optional momentum summary.
///
/// A missing file means no summary; an unreadable one is logged and skipped.
pub fn load_momentum_summary(path: &Path) -> Option<MomentumSummary> {
    if !path.exists() {
        debug!("No momentum summary at {:?}", path);
        return None;
    }

    let parsed = std::fs::read(path)
        .context("read failed")
        .and_then(|bytes| {
            serde_json::from_slice::<MomentumSummary>(&bytes).context("invalid summary JSON")
        });

    match parsed {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!("Ignoring unreadable momentum summary {:?}: {}", path, e);
            None
        }
    }
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Dataset is empty"),
            Self::NoAlerts => write!(f, "Dataset loaded, no alerts sent"),
            Self::Loaded => write!(f, "Dataset loaded"),
        }
    }
}

fn write_summary(f: &mut fmt::Formatter<'_>, title: &str, summary: &Summary) -> fmt::Result {
    match summary {
        Summary::NotApplicable => writeln!(f, "{title}: n/a"),
        Summary::Available(s) => writeln!(
            f,
            "{title}: count={} mean={:.2} min={:.2} p25={:.2} median={:.2} p75={:.2} max={:.2} std={}",
            s.count,
            s.mean,
            s.min,
            s.p25,
            s.median,
            s.p75,
            s.max,
            s.std.map_or("n/a".to_string(), |v| format!("{v:.2}")),
        ),
    }
}

fn write_ranking(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    ranking: &Ranking,
    empty: &str,
) -> fmt::Result {
    writeln!(f, "\n{title}")?;
    match ranking {
        Ranking::NoAlerts => writeln!(f, "  {empty}"),
        Ranking::Ranked(symbols) => {
            for (i, s) in symbols.iter().enumerate() {
                let name = if s.symbol.is_empty() { "(none)" } else { s.symbol.as_str() };
                writeln!(f, "  {:>2}. {:<12} {:>8.2}  (n={})", i + 1, name, s.mean_score, s.sample_count)?;
            }
            Ok(())
        }
    }
}

fn write_counts(f: &mut fmt::Formatter<'_>, title: &str, counts: &[LabelCount]) -> fmt::Result {
    writeln!(f, "\n{title}")?;
    if counts.is_empty() {
        return writeln!(f, "  none");
    }
    for c in counts {
        writeln!(f, "  {:<24} {}", c.label, c.count)?;
    }
    Ok(())
}

impl fmt::Display for TrackerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.status)?;
        writeln!(f, "Total entries: {}", self.total_entries)?;
        writeln!(f, "Total alerts sent: {}\n", self.total_alerts)?;

        write_summary(f, "Score (all)", &self.score_all)?;
        write_summary(f, "Score (alerts)", &self.score_alerts)?;
        write_summary(f, "RSI 15m (all)", &self.rsi_all)?;
        write_summary(f, "RSI 15m (alerts)", &self.rsi_alerts)?;
        write_summary(f, "RSI 15m (rejected)", &self.rsi_rejected)?;
        write_summary(f, "Heat index (all)", &self.heat_all)?;

        let no_alerts = "No alerts found.";
        write_ranking(f, "Top symbols (avg score, alerts)", &self.top_symbols, no_alerts)?;
        write_ranking(f, "Weakest symbols (avg score, alerts)", &self.weakest_symbols, no_alerts)?;
        write_ranking(
            f,
            "Weakest symbols (avg score, all entries)",
            &self.weakest_symbols_all,
            "No entries.",
        )?;

        write_counts(f, "MACD alignment", &self.macd_alignment)?;
        write_counts(f, "Rejection reasons", &self.rejection_reasons)?;

        writeln!(f, "\nAlerts by hour (UTC)")?;
        if self.alerts_by_hour.is_empty() {
            writeln!(f, "  none")?;
        }
        for h in &self.alerts_by_hour {
            writeln!(f, "  {:02}:00  {}", h.hour, h.count)?;
        }

        if let Some(m) = &self.momentum {
            let show = |v: &Option<Value>| match v {
                None | Some(Value::Null) => "-".to_string(),
                Some(v) => value_label(v),
            };
            writeln!(f, "\nMomentum")?;
            writeln!(f, "  total cycles:  {}", show(&m.total_cycles))?;
            writeln!(f, "  successes:     {}", show(&m.success_total))?;
            writeln!(f, "  failures:      {}", show(&m.failures))?;
            writeln!(f, "  still active:  {}", show(&m.still_active))?;
            for (key, value) in &m.extra {
                writeln!(f, "  {:<14} {}", format!("{key}:"), value_label(value))?;
            }
        }

        Ok(())
    }
}
