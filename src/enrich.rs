use crate::error::{PipelineError, Result};
use crate::types::{EnrichedRecord, RawRecord, Season};
use crate::util::parse_date;
use chrono::Datelike;

/// Attach year, month and season to every record.
///
/// A single unparseable date fails the whole batch: every later stage groups
/// on the date, so there is no sensible way to carry the row forward.
/// `row` in the error is 1-based and counts data rows only.
pub fn enrich(records: &[RawRecord]) -> Result<Vec<EnrichedRecord>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let date = parse_date(&r.date).ok_or_else(|| PipelineError::InvalidDate {
                row: i + 1,
                value: r.date.clone(),
            })?;
            let month = date.month();
            Ok(EnrichedRecord {
                date,
                region: r.region.clone(),
                operator: r.operator.clone(),
                scheduled_trips: r.scheduled_trips,
                on_time_trips: r.on_time_trips,
                delayed_trips: r.delayed_trips,
                avg_delay_minutes: r.avg_delay_minutes,
                punctuality_rate: r.punctuality_rate,
                passenger_impact_score: r.passenger_impact_score,
                year: date.year(),
                month,
                season: Season::from_month(month),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(date: &str) -> RawRecord {
        RawRecord {
            date: date.to_string(),
            region: "Oslo".into(),
            operator: "Ruter".into(),
            scheduled_trips: 100,
            on_time_trips: 90,
            delayed_trips: 10,
            avg_delay_minutes: 2.0,
            punctuality_rate: 90.0,
            passenger_impact_score: 1.0,
        }
    }

    #[test]
    fn derives_calendar_fields() {
        let out = enrich(&[raw("2020-12-15"), raw("2021-07-01")]).unwrap();
        assert_eq!((out[0].year, out[0].month, out[0].season), (2020, 12, Season::Winter));
        assert_eq!((out[1].year, out[1].month, out[1].season), (2021, 7, Season::Summer));
    }

    #[test]
    fn bad_date_fails_the_batch() {
        let err = enrich(&[raw("2020-01-01"), raw("2020-13-01")]).unwrap_err();
        match err {
            PipelineError::InvalidDate { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "2020-13-01");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
