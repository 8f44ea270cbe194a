use crate::types::{EnrichedRecord, MonthlyAggregate};
use crate::util::{max, mean, min, round1};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

type GroupKey = (NaiveDate, String, String);

/// Collapse enriched records to one row per (date, region, operator).
///
/// Output is ordered by the key (date, then region, then operator), which is
/// also the chronological order every per-series computation relies on.
pub fn aggregate_monthly(records: &[EnrichedRecord]) -> Vec<MonthlyAggregate> {
    let mut groups: BTreeMap<GroupKey, Vec<&EnrichedRecord>> = BTreeMap::new();
    for r in records {
        groups
            .entry((r.date, r.region.clone(), r.operator.clone()))
            .or_default()
            .push(r);
    }

    let out: Vec<MonthlyAggregate> = groups
        .into_iter()
        .filter_map(|((date, region, operator), rows)| reduce_group(date, region, operator, &rows))
        .collect();
    debug!(input = records.len(), groups = out.len(), "Aggregated records");
    out
}

/// Explicit per-field reductions for one group. `None` only for an empty
/// group, which the grouping above never produces.
fn reduce_group(
    date: NaiveDate,
    region: String,
    operator: String,
    rows: &[&EnrichedRecord],
) -> Option<MonthlyAggregate> {
    let first = rows.first()?;

    let scheduled: Vec<f64> = rows.iter().map(|r| r.scheduled_trips as f64).collect();
    let on_time: Vec<f64> = rows.iter().map(|r| r.on_time_trips as f64).collect();
    let delayed: Vec<f64> = rows.iter().map(|r| r.delayed_trips as f64).collect();
    let delay: Vec<f64> = rows.iter().map(|r| r.avg_delay_minutes).collect();
    let punctuality: Vec<f64> = rows.iter().map(|r| r.punctuality_rate).collect();
    let impact: Vec<f64> = rows.iter().map(|r| r.passenger_impact_score).collect();

    Some(MonthlyAggregate {
        date,
        region,
        operator,
        year: first.year,
        month: first.month,
        season: first.season,
        scheduled_trips_total: rows.iter().map(|r| u64::from(r.scheduled_trips)).sum(),
        scheduled_trips_mean: round1(mean(&scheduled)?),
        on_time_trips_total: rows.iter().map(|r| u64::from(r.on_time_trips)).sum(),
        on_time_trips_mean: round1(mean(&on_time)?),
        delayed_trips_total: rows.iter().map(|r| u64::from(r.delayed_trips)).sum(),
        delayed_trips_mean: round1(mean(&delayed)?),
        avg_delay_mean: round1(mean(&delay)?),
        avg_delay_max: round1(max(&delay)?),
        punctuality_rate_mean: round1(mean(&punctuality)?),
        punctuality_rate_min: round1(min(&punctuality)?),
        punctuality_rate_max: round1(max(&punctuality)?),
        passenger_impact_mean: round1(mean(&impact)?),
        passenger_impact_total: round1(impact.iter().sum()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Season;

    fn rec(
        ymd: (i32, u32, u32),
        region: &str,
        operator: &str,
        punct: f64,
        delay: f64,
    ) -> EnrichedRecord {
        let date = NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap();
        EnrichedRecord {
            date,
            region: region.into(),
            operator: operator.into(),
            scheduled_trips: 100,
            on_time_trips: 90,
            delayed_trips: 10,
            avg_delay_minutes: delay,
            punctuality_rate: punct,
            passenger_impact_score: 1.25,
            year: ymd.0,
            month: ymd.1,
            season: Season::from_month(ymd.1),
        }
    }

    #[test]
    fn one_row_per_distinct_key() {
        let records = vec![
            rec((2020, 1, 1), "Oslo", "Ruter", 90.0, 2.0),
            rec((2020, 1, 1), "Oslo", "Ruter", 80.0, 4.0),
            rec((2020, 1, 1), "Oslo", "Vy", 70.0, 1.0),
            rec((2020, 2, 1), "Oslo", "Ruter", 85.0, 3.0),
        ];
        let out = aggregate_monthly(&records);
        assert_eq!(out.len(), 3);

        let g = &out[0];
        assert_eq!((g.region.as_str(), g.operator.as_str()), ("Oslo", "Ruter"));
        assert_eq!(g.scheduled_trips_total, 200);
        assert_eq!(g.scheduled_trips_mean, 100.0);
        assert_eq!(g.punctuality_rate_mean, 85.0);
        assert_eq!(g.punctuality_rate_min, 80.0);
        assert_eq!(g.punctuality_rate_max, 90.0);
        assert_eq!(g.avg_delay_mean, 3.0);
        assert_eq!(g.avg_delay_max, 4.0);
        assert_eq!(g.passenger_impact_total, 2.5);
        // 1.25 rounds to even
        assert_eq!(g.passenger_impact_mean, 1.2);
    }

    #[test]
    fn output_is_sorted_by_date_region_operator() {
        let records = vec![
            rec((2020, 2, 1), "Oslo", "Ruter", 85.0, 3.0),
            rec((2020, 1, 1), "Oslo", "Vy", 70.0, 1.0),
            rec((2020, 1, 1), "Bergen", "Skyss", 70.0, 1.0),
        ];
        let out = aggregate_monthly(&records);
        let keys: Vec<_> = out.iter().map(|g| (g.date.to_string(), g.region.clone())).collect();
        assert_eq!(
            keys,
            vec![
                ("2020-01-01".to_string(), "Bergen".to_string()),
                ("2020-01-01".to_string(), "Oslo".to_string()),
                ("2020-02-01".to_string(), "Oslo".to_string()),
            ]
        );
    }

    #[test]
    fn single_row_group_degenerates_to_values() {
        let out = aggregate_monthly(&[rec((2020, 3, 1), "Oslo", "Ruter", 91.3, 2.7)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].punctuality_rate_mean, 91.3);
        assert_eq!(out[0].punctuality_rate_min, 91.3);
        assert_eq!(out[0].avg_delay_max, 2.7);
        assert_eq!(out[0].season, Season::Spring);
    }
}
