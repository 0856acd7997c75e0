//! Dense-matrix reconciliation of per-group bucket rows.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDateTime;

use crate::models::{ChartSeries, Dataset};
use crate::store::BucketRow;

use super::range::RangeKind;

/// Fold bucket rows into a chart series.
///
/// The label axis is the union of every bucket seen in any group, sorted
/// chronologically. Each group gets one dataset aligned to that axis, with
/// `0.0` for buckets it has no row for. Datasets are ordered by group label.
pub fn reconcile(range: RangeKind, rows: Vec<BucketRow>) -> ChartSeries {
    // ---
    let mut axis: BTreeSet<NaiveDateTime> = BTreeSet::new();
    let mut groups: BTreeMap<String, HashMap<NaiveDateTime, f64>> = BTreeMap::new();

    for row in rows {
        axis.insert(row.bucket);
        groups
            .entry(row.grp)
            .or_default()
            .insert(row.bucket, row.value.unwrap_or(0.0));
    }

    let labels = axis.iter().map(|bucket| range.label(*bucket)).collect();
    let datasets = groups
        .into_iter()
        .map(|(label, values)| Dataset {
            label,
            data: axis
                .iter()
                .map(|bucket| values.get(bucket).copied().unwrap_or(0.0))
                .collect(),
        })
        .collect();

    ChartSeries { labels, datasets }
}

/// Collapse filtered rows into a single series named after the filter.
///
/// Always yields exactly one dataset, empty when nothing matched.
pub fn single_series(range: RangeKind, label: &str, rows: Vec<BucketRow>) -> ChartSeries {
    // ---
    let relabeled = rows
        .into_iter()
        .map(|row| BucketRow {
            grp: label.to_string(),
            ..row
        })
        .collect();

    let mut series = reconcile(range, relabeled);
    if series.datasets.is_empty() {
        series.datasets.push(Dataset {
            label: label.to_string(),
            data: Vec::new(),
        });
    }
    series
}
