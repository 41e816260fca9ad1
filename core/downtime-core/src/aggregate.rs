//! Aggregated downtime per process and per reason.
//!
//! Recomputed from the history table on every call, so the figures always
//! reflect the latest append or wipe. Keys keep first-seen order, which is
//! also the order bars are drawn in.

use serde::Serialize;

use crate::error::Result;
use crate::history::{HistoryRow, HistoryStore};

/// Total minutes for one key and its share of the grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: String,
    pub minutes: f64,
    pub percentage: f64,
}

/// Ordered key → (minutes, percentage) mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Breakdown {
    buckets: Vec<Bucket>,
}

impl Breakdown {
    fn add(&mut self, key: &str, minutes: f64) {
        match self.buckets.iter_mut().find(|b| b.key == key) {
            Some(bucket) => bucket.minutes += minutes,
            None => self.buckets.push(Bucket {
                key: key.to_string(),
                minutes,
                percentage: 0.0,
            }),
        }
    }

    fn finish(&mut self, grand_total: f64) {
        for bucket in &mut self.buckets {
            bucket.percentage = if grand_total > 0.0 {
                100.0 * bucket.minutes / grand_total
            } else {
                0.0
            };
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn get(&self, key: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.key == key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Renders a horizontal text bar chart, one line per key, labelled with
    /// total minutes and `{:.1}%`.
    pub fn render_bars(&self, width: usize) -> String {
        let max = self
            .buckets
            .iter()
            .map(|b| b.minutes)
            .fold(0.0_f64, f64::max);
        let label_width = self
            .buckets
            .iter()
            .map(|b| b.key.chars().count())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for bucket in &self.buckets {
            let filled = if max > 0.0 {
                ((bucket.minutes / max) * width as f64).round() as usize
            } else {
                0
            };
            let pad = label_width - bucket.key.chars().count();
            out.push_str(&format!(
                "{}{} │{} {:.2} min ({:.1}%)\n",
                bucket.key,
                " ".repeat(pad),
                "█".repeat(filled),
                bucket.minutes,
                bucket.percentage
            ));
        }
        out
    }
}

/// Both groupings plus the grand total.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Aggregates {
    pub by_process: Breakdown,
    pub by_reason: Breakdown,
    pub grand_total_minutes: f64,
}

impl Aggregates {
    /// Folds rows into totals.
    ///
    /// Rows missing a process, a reason or a non-zero duration are skipped.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a HistoryRow>) -> Self {
        let mut acc = Aggregates::default();
        for row in rows {
            acc.accumulate(row);
        }
        acc.finish();
        acc
    }

    fn accumulate(&mut self, row: &HistoryRow) {
        let (Some(process), Some(reason), Some(minutes)) =
            (row.process.as_deref(), row.reason.as_deref(), row.duration_minutes)
        else {
            return;
        };
        if process.is_empty() || reason.is_empty() || minutes == 0.0 || !minutes.is_finite() {
            return;
        }

        self.grand_total_minutes += minutes;
        self.by_process.add(process, minutes);
        self.by_reason.add(reason, minutes);
    }

    fn finish(&mut self) {
        self.by_process.finish(self.grand_total_minutes);
        self.by_reason.finish(self.grand_total_minutes);
    }

    pub fn is_empty(&self) -> bool {
        self.by_process.is_empty() && self.by_reason.is_empty()
    }
}

/// What the chart screen should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HistorySummary {
    /// The history table does not exist (never written, or wiped).
    NoHistory,
    /// The table exists; its aggregates may still be empty.
    Report(Aggregates),
}

/// Scans the history and aggregates it.
pub fn summarize(history: &HistoryStore) -> Result<HistorySummary> {
    let mut acc = Aggregates::default();
    let found = history.for_each_row(|row| acc.accumulate(&row))?;
    if !found {
        return Ok(HistorySummary::NoHistory);
    }
    acc.finish();
    Ok(HistorySummary::Report(acc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(process: &str, reason: &str, minutes: f64) -> HistoryRow {
        HistoryRow {
            process: Some(process.to_string()),
            reason: Some(reason.to_string()),
            duration_minutes: Some(minutes),
            ..HistoryRow::default()
        }
    }

    #[test]
    fn test_groupings_and_percentages() {
        let rows = vec![
            row("P1", "R1", 10.0),
            row("P1", "R2", 20.0),
            row("P2", "R1", 30.0),
        ];
        let agg = Aggregates::from_rows(&rows);

        assert_eq!(agg.grand_total_minutes, 60.0);
        assert_eq!(agg.by_process.get("P1").unwrap().minutes, 30.0);
        assert_eq!(agg.by_process.get("P2").unwrap().minutes, 30.0);
        assert_eq!(agg.by_reason.get("R1").unwrap().minutes, 40.0);
        assert_eq!(agg.by_reason.get("R2").unwrap().minutes, 20.0);
        assert!((agg.by_process.get("P1").unwrap().percentage - 50.0).abs() < 1e-9);
        assert!((agg.by_process.get("P2").unwrap().percentage - 50.0).abs() < 1e-9);
        assert!((agg.by_reason.get("R2").unwrap().percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_keys_keep_first_seen_order() {
        let rows = vec![
            row("Zeta", "b", 1.0),
            row("Alfa", "a", 1.0),
            row("Zeta", "c", 1.0),
        ];
        let agg = Aggregates::from_rows(&rows);
        let keys: Vec<_> = agg.by_process.buckets().iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["Zeta", "Alfa"]);
        let reasons: Vec<_> = agg.by_reason.buckets().iter().map(|b| b.key.as_str()).collect();
        assert_eq!(reasons, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_incomplete_rows_are_skipped() {
        let rows = vec![
            row("P1", "R1", 10.0),
            HistoryRow {
                process: None,
                ..row("P1", "R1", 5.0)
            },
            HistoryRow {
                reason: None,
                ..row("P1", "R1", 5.0)
            },
            HistoryRow {
                duration_minutes: None,
                ..row("P1", "R1", 5.0)
            },
            row("P3", "R9", 0.0),
        ];
        let agg = Aggregates::from_rows(&rows);
        assert_eq!(agg.grand_total_minutes, 10.0);
        assert_eq!(agg.by_process.len(), 1);
        assert!(agg.by_process.get("P3").is_none());
    }

    #[test]
    fn test_no_rows_gives_empty_mappings() {
        let agg = Aggregates::from_rows(&Vec::<HistoryRow>::new());
        assert!(agg.is_empty());
        assert_eq!(agg.grand_total_minutes, 0.0);
    }

    #[test]
    fn test_render_bars_labels_percentages() {
        let rows = vec![row("Carregamento", "R1", 30.0), row("Inspeção", "R1", 10.0)];
        let agg = Aggregates::from_rows(&rows);
        let chart = agg.by_process.render_bars(20);
        let lines: Vec<_> = chart.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Carregamento │"));
        assert!(lines[0].ends_with("30.00 min (75.0%)"));
        assert!(lines[1].ends_with("10.00 min (25.0%)"));
        assert_eq!(lines[0].matches('█').count(), 20);
        assert_eq!(lines[1].matches('█').count(), 5);
    }
}
