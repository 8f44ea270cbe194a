//! Series-relative metrics.
//!
//! Rows are split into one series per (region, operator), each already in
//! date order, and the sequence operations below run on one series at a
//! time. Results are written back at the original row positions so the
//! table keeps its (date, region, operator) order.

use crate::types::{DerivedMetrics, DerivedRecord, MonthlyAggregate};
use crate::util::{mean, round1, round1_opt};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Width of the centered smoothing window for `punctuality_trend`.
pub const TREND_WINDOW: usize = 3;

/// Signed difference to the previous value; the first element is 0.
pub fn first_difference(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        out.push(prev.map_or(0.0, |p| v - p));
        prev = Some(v);
    }
    out
}

/// Mean over a window centered on each element; `None` wherever the window
/// would run past either end of the series. `window` is expected to be odd.
pub fn centered_rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            if window == 0 || i < half || i + half >= values.len() {
                None
            } else {
                mean(&values[i - half..=i + half])
            }
        })
        .collect()
}

/// Percent change against the previous element sharing the same month.
///
/// 0 when the month has not been seen before in the series, and also when
/// the previous value is 0 (no finite ratio exists).
pub fn same_month_pct_change(values: &[f64], months: &[u32]) -> Vec<f64> {
    let mut last_by_month: [Option<f64>; 13] = [None; 13];
    values
        .iter()
        .zip(months)
        .map(|(&v, &m)| {
            let slot = &mut last_by_month[m as usize % 13];
            let change = match *slot {
                Some(prev) if prev != 0.0 => (v - prev) / prev * 100.0,
                _ => 0.0,
            };
            *slot = Some(v);
            change
        })
        .collect()
}

/// `on_time / scheduled * 100`, undefined when nothing was scheduled.
pub fn service_reliability(on_time_total: u64, scheduled_total: u64) -> Option<f64> {
    if scheduled_total == 0 {
        return None;
    }
    Some(round1(on_time_total as f64 / scheduled_total as f64 * 100.0))
}

/// How far the worst delay sits above the typical one, as a 0-100 score.
pub fn delay_consistency(avg_delay_max: f64, avg_delay_mean: f64) -> f64 {
    round1((100.0 - (avg_delay_max - avg_delay_mean) * 10.0).clamp(0.0, 100.0))
}

/// Compute derived metrics for the whole aggregated table.
pub fn derive_metrics(rows: Vec<MonthlyAggregate>) -> Vec<DerivedRecord> {
    let mut series: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (i, r) in rows.iter().enumerate() {
        series
            .entry((r.region.clone(), r.operator.clone()))
            .or_default()
            .push(i);
    }

    let mut improvement = vec![0.0; rows.len()];
    let mut trend: Vec<Option<f64>> = vec![None; rows.len()];
    let mut yoy = vec![0.0; rows.len()];

    for idx in series.values() {
        let punct: Vec<f64> = idx.iter().map(|&i| rows[i].punctuality_rate_mean).collect();
        let months: Vec<u32> = idx.iter().map(|&i| rows[i].month).collect();

        let diffs = first_difference(&punct);
        let smooth = centered_rolling_mean(&punct, TREND_WINDOW);
        let changes = same_month_pct_change(&punct, &months);

        for (k, &i) in idx.iter().enumerate() {
            improvement[i] = round1(diffs[k]);
            trend[i] = round1_opt(smooth[k]);
            yoy[i] = round1(changes[k]);
        }
    }
    debug!(series = series.len(), rows = rows.len(), "Computed series metrics");

    let mut undefined_reliability = 0usize;
    let out: Vec<DerivedRecord> = rows
        .into_iter()
        .enumerate()
        .map(|(i, aggregate)| {
            let reliability =
                service_reliability(aggregate.on_time_trips_total, aggregate.scheduled_trips_total);
            if reliability.is_none() {
                undefined_reliability += 1;
            }
            let metrics = DerivedMetrics {
                punctuality_improvement: improvement[i],
                service_reliability: reliability,
                delay_consistency: delay_consistency(
                    aggregate.avg_delay_max,
                    aggregate.avg_delay_mean,
                ),
                punctuality_trend: trend[i],
                yoy_punctuality_change: yoy[i],
            };
            DerivedRecord { aggregate, metrics }
        })
        .collect();

    if undefined_reliability > 0 {
        warn!(
            rows = undefined_reliability,
            "Rows with zero scheduled trips; service_reliability left undefined"
        );
    }
    out
}
