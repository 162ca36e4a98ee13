//! Configuration for the tracker pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::aggregate::DEFAULT_RANK_LIMIT;

/// Paths and table sizes for a tracker run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Newline-delimited JSON alert log (may be `.zst` compressed)
    pub log_path: PathBuf,

    /// Cleaned dataset artifact, overwritten on every run
    pub output_path: PathBuf,

    /// Optional momentum summary produced outside the tracker
    pub summary_path: PathBuf,

    /// Number of symbols in the top ranking
    pub top_n: usize,

    /// Number of symbols in the weakest ranking
    pub bottom_n: usize,

    /// Number of rejection reasons reported
    pub reason_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("alert_log.jsonl"),
            output_path: PathBuf::from("pingr_cleaned_data.csv"),
            summary_path: PathBuf::from("momentum_summary.json"),
            top_n: DEFAULT_RANK_LIMIT,
            bottom_n: DEFAULT_RANK_LIMIT,
            reason_limit: 15,
        }
    }
}
