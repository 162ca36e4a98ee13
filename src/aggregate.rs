//! Per-symbol ranking and categorical breakdowns over alert records

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::stats::{mean, Subset};
use crate::types::AlertRecord;

/// Default length of the top / weakest symbol tables
pub const DEFAULT_RANK_LIMIT: usize = 10;

/// Mean signal score for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAggregate {
    pub symbol: String,
    pub mean_score: f64,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    /// Highest mean score first
    Strongest,
    /// Lowest mean score first
    Weakest,
}

/// Outcome of a ranking pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "symbols", rename_all = "snake_case")]
pub enum Ranking {
    /// Nothing to rank: no alert-positive records (or no records at all for `Subset::All`)
    NoAlerts,
    Ranked(Vec<SymbolAggregate>),
}

impl Ranking {
    pub fn symbols(&self) -> &[SymbolAggregate] {
        match self {
            Ranking::NoAlerts => &[],
            Ranking::Ranked(symbols) => symbols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.symbols().is_empty()
    }
}

/// Top symbols by mean score over sent alerts
pub fn top_symbols(records: &[AlertRecord], limit: usize) -> Ranking {
    rank_symbols(records, Subset::AlertsOnly, RankOrder::Strongest, limit)
}

/// Weakest symbols by mean score within `subset`
pub fn weakest_symbols(records: &[AlertRecord], subset: Subset, limit: usize) -> Ranking {
    rank_symbols(records, subset, RankOrder::Weakest, limit)
}

/// Group `subset` by symbol, rank by mean score and keep `limit` groups.
///
/// Equal means are ordered by symbol name ascending, in both directions.
pub fn rank_symbols(
    records: &[AlertRecord],
    subset: Subset,
    order: RankOrder,
    limit: usize,
) -> Ranking {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records.iter().filter(|r| subset.contains(r)) {
        groups
            .entry(record.symbol.as_str())
            .or_default()
            .push(record.signal_score);
    }

    if groups.is_empty() {
        return Ranking::NoAlerts;
    }

    let mut ranked: Vec<SymbolAggregate> = groups
        .into_iter()
        .filter_map(|(symbol, scores)| {
            Some(SymbolAggregate {
                symbol: symbol.to_string(),
                mean_score: mean(&scores)?,
                sample_count: scores.len(),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        let by_score = match order {
            RankOrder::Strongest => b.mean_score.total_cmp(&a.mean_score),
            RankOrder::Weakest => a.mean_score.total_cmp(&b.mean_score),
        };
        by_score.then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.truncate(limit);

    Ranking::Ranked(ranked)
}

/// A label and how often it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Most frequent rejection reasons across all records
pub fn rejection_reason_counts(records: &[AlertRecord], limit: usize) -> Vec<LabelCount> {
    let reasons = records
        .iter()
        .filter_map(|r| r.rejection_reasons())
        .flatten();
    let mut counts = count_labels(reasons);
    counts.truncate(limit);
    counts
}

/// Frequency of `context.macd_alignment` values
pub fn macd_alignment_counts(records: &[AlertRecord]) -> Vec<LabelCount> {
    count_labels(records.iter().filter_map(|r| r.macd_alignment()))
}

/// Count labels, most frequent first, ties by label
fn count_labels(labels: impl Iterator<Item = String>) -> Vec<LabelCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut counts: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

/// Sent alerts per UTC hour of day. Records without a timestamp are skipped.
pub fn alerts_by_hour(records: &[AlertRecord]) -> Vec<HourCount> {
    use chrono::Timelike;

    let mut hours: BTreeMap<u32, usize> = BTreeMap::new();
    for record in records.iter().filter(|r| r.alert_sent) {
        if let Some(ts) = record.timestamp {
            *hours.entry(ts.hour()).or_insert(0) += 1;
        }
    }

    hours
        .into_iter()
        .map(|(hour, count)| HourCount { hour, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn alert(symbol: &str, score: f64, sent: bool) -> AlertRecord {
        AlertRecord {
            timestamp: None,
            symbol: symbol.to_string(),
            signal_score: score,
            rsi_15m: None,
            heat_index: None,
            alert_sent: sent,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_single_symbol_mean() {
        let records = vec![alert("BTC", 1.0, true), alert("BTC", 3.0, true)];
        assert_eq!(
            top_symbols(&records, DEFAULT_RANK_LIMIT),
            Ranking::Ranked(vec![SymbolAggregate {
                symbol: "BTC".to_string(),
                mean_score: 2.0,
                sample_count: 2,
            }])
        );
    }

    #[test]
    fn test_ignores_unsent_records() {
        let records = vec![
            alert("BTC", 1.0, true),
            alert("ETH", 99.0, false),
            alert("BTC", 5.0, false),
        ];
        let ranking = top_symbols(&records, DEFAULT_RANK_LIMIT);
        assert_eq!(ranking.symbols().len(), 1);
        assert_eq!(ranking.symbols()[0].mean_score, 1.0);
    }

    #[test]
    fn test_no_alerts_state() {
        assert_eq!(top_symbols(&[], DEFAULT_RANK_LIMIT), Ranking::NoAlerts);
        let unsent = vec![alert("BTC", 4.0, false)];
        assert_eq!(top_symbols(&unsent, DEFAULT_RANK_LIMIT), Ranking::NoAlerts);
        assert!(weakest_symbols(&unsent, Subset::AlertsOnly, DEFAULT_RANK_LIMIT).is_empty());
    }

    #[test]
    fn test_truncates_and_sorts_descending() {
        let records: Vec<_> = (0..15)
            .map(|i| alert(&format!("SYM{i:02}"), (i % 7) as f64, true))
            .collect();
        let ranking = top_symbols(&records, DEFAULT_RANK_LIMIT);
        let symbols = ranking.symbols();

        assert_eq!(symbols.len(), 10);
        assert!(symbols.windows(2).all(|w| w[0].mean_score >= w[1].mean_score));
        assert_eq!(symbols[0].mean_score, 6.0);
    }

    #[test]
    fn test_ties_break_by_symbol() {
        let records = vec![
            alert("SOL", 2.0, true),
            alert("ADA", 2.0, true),
            alert("ETH", 2.0, true),
            alert("BTC", 1.0, true),
        ];
        let top: Vec<_> = top_symbols(&records, 10)
            .symbols()
            .iter()
            .map(|s| s.symbol.clone())
            .collect();
        assert_eq!(top, vec!["ADA", "ETH", "SOL", "BTC"]);

        let weakest: Vec<_> = weakest_symbols(&records, Subset::AlertsOnly, 2)
            .symbols()
            .iter()
            .map(|s| s.symbol.clone())
            .collect();
        assert_eq!(weakest, vec!["BTC", "ADA"]);
    }

    #[test]
    fn test_weighted_means_sum_to_total() {
        let records = vec![
            alert("BTC", 1.5, true),
            alert("ETH", -2.0, true),
            alert("BTC", 4.0, true),
            alert("", 0.0, true),
            alert("ETH", 7.25, true),
            alert("XRP", 100.0, false),
        ];
        let ranking = top_symbols(&records, DEFAULT_RANK_LIMIT);
        let weighted: f64 = ranking
            .symbols()
            .iter()
            .map(|s| s.mean_score * s.sample_count as f64)
            .sum();
        let total: f64 = records.iter().filter(|r| r.alert_sent).map(|r| r.signal_score).sum();
        assert!((weighted - total).abs() < 1e-9);
        assert!(ranking.symbols().iter().any(|s| s.symbol.is_empty()));
    }

    #[test]
    fn test_weakest_over_all_records() {
        let records = vec![
            alert("BTC", 3.0, true),
            alert("ETH", 2.0, true),
            alert("DOGE", -4.0, false),
            alert("DOGE", -2.0, false),
        ];

        let alerts_only = weakest_symbols(&records, Subset::AlertsOnly, DEFAULT_RANK_LIMIT);
        assert!(alerts_only.symbols().iter().all(|s| s.symbol != "DOGE"));

        let all = weakest_symbols(&records, Subset::All, DEFAULT_RANK_LIMIT);
        assert_eq!(
            all.symbols()[0],
            SymbolAggregate { symbol: "DOGE".to_string(), mean_score: -3.0, sample_count: 2 }
        );
        assert_eq!(all.symbols().len(), 3);

        assert_eq!(weakest_symbols(&[], Subset::All, DEFAULT_RANK_LIMIT), Ranking::NoAlerts);
    }

    #[test]
    fn test_extreme_scores_keep_finite_mean() {
        let records = vec![alert("BTC", 1e308, true), alert("BTC", 1e308, true)];
        let ranking = top_symbols(&records, DEFAULT_RANK_LIMIT);
        assert_eq!(ranking.symbols()[0].mean_score, 1e308);

        let json = serde_json::to_value(&ranking).unwrap();
        assert!(json["symbols"][0]["mean_score"].is_number());
    }

    #[test]
    fn test_rejection_reason_counts() {
        let mut records = vec![alert("BTC", 1.0, false); 3];
        records[0].extra.insert("rejected".into(), json!(["spread", "rsi_high"]));
        records[1].extra.insert("rejected".into(), json!(["rsi_high"]));
        records[2].extra.insert("rejected".into(), json!("cooldown"));

        let counts = rejection_reason_counts(&records, 2);
        assert_eq!(
            counts,
            vec![
                LabelCount { label: "rsi_high".into(), count: 2 },
                LabelCount { label: "cooldown".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_macd_alignment_counts() {
        let mut records = vec![alert("BTC", 1.0, true); 4];
        records[0].extra.insert("context".into(), json!({"macd_alignment": "bullish"}));
        records[1].extra.insert("context".into(), json!({"macd_alignment": "bullish"}));
        records[2].extra.insert("context".into(), json!({"macd_alignment": "bearish"}));

        let counts = macd_alignment_counts(&records);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0], LabelCount { label: "bullish".into(), count: 2 });
        assert!(macd_alignment_counts(&records[3..]).is_empty());
    }

    #[test]
    fn test_alerts_by_hour() {
        let at = |h: u32, sent: bool| {
            let mut r = alert("BTC", 1.0, sent);
            r.timestamp = Some(Utc.with_ymd_and_hms(2025, 11, 2, h, 15, 0).unwrap());
            r
        };
        let records = vec![at(14, true), at(9, true), at(14, true), at(3, false), alert("ETH", 1.0, true)];
        assert_eq!(
            alerts_by_hour(&records),
            vec![HourCount { hour: 9, count: 1 }, HourCount { hour: 14, count: 2 }]
        );
    }
}
