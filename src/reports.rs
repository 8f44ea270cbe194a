use crate::types::{
    ClassifiedRecord, OperatorRanking, ProcessingSummary, Season, SeasonOverview,
    SeasonalAnalysis, SeasonalProfile,
};
use crate::util::{max, mean, min, round1, round1_opt, sample_std};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Composite score weights: punctuality, inverted impact, delay consistency.
const PUNCTUALITY_WEIGHT: f64 = 0.4;
const IMPACT_WEIGHT: f64 = 0.3;
const CONSISTENCY_WEIGHT: f64 = 0.3;
/// Each point of average impact costs this much of the 100-point impact term.
const IMPACT_PENALTY: f64 = 20.0;

/// Weighted operator score. The impact term is not clamped and goes negative
/// once `avg_impact` exceeds 5.
pub fn performance_score(avg_punctuality: f64, avg_impact: f64, avg_consistency: f64) -> f64 {
    round1(
        avg_punctuality * PUNCTUALITY_WEIGHT
            + (100.0 - avg_impact * IMPACT_PENALTY) * IMPACT_WEIGHT
            + avg_consistency * CONSISTENCY_WEIGHT,
    )
}

/// Dense ranks for scores already sorted descending: equal scores share a
/// rank and the next distinct score gets the following integer.
pub fn dense_rank_desc(sorted_scores: &[f64]) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(sorted_scores.len());
    let mut rank = 0u32;
    let mut prev: Option<f64> = None;
    for &s in sorted_scores {
        if prev != Some(s) {
            rank += 1;
            prev = Some(s);
        }
        ranks.push(rank);
    }
    ranks
}

pub fn rank_operators(data: &[ClassifiedRecord]) -> Vec<OperatorRanking> {
    #[derive(Default)]
    struct Acc {
        punctuality: Vec<f64>,
        impact: Vec<f64>,
        trips: Vec<u64>,
        reliability: Vec<f64>,
        consistency: Vec<f64>,
    }

    let mut map: BTreeMap<(String, String), Acc> = BTreeMap::new();
    for r in data {
        let e = map
            .entry((r.operator.clone(), r.region.clone()))
            .or_default();
        e.punctuality.push(r.punctuality_rate_mean);
        e.impact.push(r.passenger_impact_mean);
        e.trips.push(r.scheduled_trips_total);
        if let Some(rel) = r.service_reliability {
            e.reliability.push(rel);
        }
        e.consistency.push(r.delay_consistency);
    }

    // A group that cannot produce its core statistics is left out of the
    // report rather than failing it.
    let mut rows: Vec<OperatorRanking> = map
        .into_iter()
        .filter_map(|((operator, region), acc)| {
            let avg_punctuality = round1(mean(&acc.punctuality)?);
            let avg_impact = round1(mean(&acc.impact)?);
            let avg_consistency = round1(mean(&acc.consistency)?);
            let total_trips: u64 = acc.trips.iter().sum();
            Some(OperatorRanking {
                performance_rank: 0,
                operator,
                region,
                avg_punctuality,
                punctuality_std: round1_opt(sample_std(&acc.punctuality)),
                worst_punctuality: round1(min(&acc.punctuality)?),
                best_punctuality: round1(max(&acc.punctuality)?),
                avg_impact,
                impact_std: round1_opt(sample_std(&acc.impact)),
                total_trips,
                avg_monthly_trips: round1(total_trips as f64 / acc.trips.len() as f64),
                avg_reliability: round1_opt(mean(&acc.reliability)),
                avg_consistency,
                performance_score: performance_score(avg_punctuality, avg_impact, avg_consistency),
            })
        })
        .collect();

    // Stable: equal scores keep (operator, region) order.
    rows.sort_by(|a, b| b.performance_score.total_cmp(&a.performance_score));
    let scores: Vec<f64> = rows.iter().map(|r| r.performance_score).collect();
    for (row, rank) in rows.iter_mut().zip(dense_rank_desc(&scores)) {
        row.performance_rank = rank;
    }
    debug!(groups = rows.len(), "Ranked operators");
    rows
}

/// Per (season, operator) statistics plus each operator's best and worst
/// season.
///
/// Profiles are ordered by season name, then operator. Best and worst pick
/// the first profile in that order holding the extreme value, so ties go to
/// the alphabetically first season.
pub fn seasonal_analysis(data: &[ClassifiedRecord]) -> SeasonalAnalysis {
    struct Acc {
        season: Season,
        punctuality: Vec<f64>,
        impact: Vec<f64>,
        delay: Vec<f64>,
    }

    let mut map: BTreeMap<(&'static str, String), Acc> = BTreeMap::new();
    for r in data {
        let e = map
            .entry((r.season.as_str(), r.operator.clone()))
            .or_insert_with(|| Acc {
                season: r.season,
                punctuality: vec![],
                impact: vec![],
                delay: vec![],
            });
        e.punctuality.push(r.punctuality_rate_mean);
        e.impact.push(r.passenger_impact_mean);
        e.delay.push(r.avg_delay_mean);
    }

    let profiles: Vec<SeasonalProfile> = map
        .into_iter()
        .filter_map(|((_, operator), acc)| {
            Some(SeasonalProfile {
                season: acc.season,
                operator,
                punctuality: round1(mean(&acc.punctuality)?),
                punctuality_std: round1_opt(sample_std(&acc.punctuality)),
                impact: round1(mean(&acc.impact)?),
                delay: round1(mean(&acc.delay)?),
            })
        })
        .collect();

    let mut best: BTreeMap<&str, &SeasonalProfile> = BTreeMap::new();
    let mut worst: BTreeMap<&str, &SeasonalProfile> = BTreeMap::new();
    for p in &profiles {
        best.entry(p.operator.as_str())
            .and_modify(|cur| {
                if p.punctuality > cur.punctuality {
                    *cur = p;
                }
            })
            .or_insert(p);
        worst
            .entry(p.operator.as_str())
            .and_modify(|cur| {
                if p.punctuality < cur.punctuality {
                    *cur = p;
                }
            })
            .or_insert(p);
    }
    let best: Vec<SeasonalProfile> = best.into_values().cloned().collect();
    let worst: Vec<SeasonalProfile> = worst.into_values().cloned().collect();

    debug!(profiles = profiles.len(), operators = best.len(), "Built seasonal profiles");
    SeasonalAnalysis {
        profiles,
        best,
        worst,
    }
}

/// Mean of the per-operator seasonal punctuality for each season, best first.
pub fn season_overview(profiles: &[SeasonalProfile]) -> Vec<SeasonOverview> {
    let mut by_season: BTreeMap<&'static str, (Season, Vec<f64>)> = BTreeMap::new();
    for p in profiles {
        by_season
            .entry(p.season.as_str())
            .or_insert_with(|| (p.season, vec![]))
            .1
            .push(p.punctuality);
    }
    let mut rows: Vec<SeasonOverview> = by_season
        .into_values()
        .filter_map(|(season, values)| {
            Some(SeasonOverview {
                season,
                punctuality: round1(mean(&values)?),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.punctuality.total_cmp(&a.punctuality));
    rows
}

/// Headline figures for the console. `None` for an empty table.
pub fn summarize(data: &[ClassifiedRecord]) -> Option<ProcessingSummary> {
    let first = data.first()?;
    let mut best = first;
    let mut worst = first;
    for r in data {
        if r.punctuality_rate_mean > best.punctuality_rate_mean {
            best = r;
        }
        if r.punctuality_rate_mean < worst.punctuality_rate_mean {
            worst = r;
        }
    }
    let punctuality: Vec<f64> = data.iter().map(|r| r.punctuality_rate_mean).collect();
    let operators: BTreeSet<&str> = data.iter().map(|r| r.operator.as_str()).collect();

    Some(ProcessingSummary {
        record_count: data.len(),
        operator_count: operators.len(),
        total_trips: data.iter().map(|r| r.scheduled_trips_total).sum(),
        avg_punctuality: round1(mean(&punctuality)?),
        best_operator: best.operator.clone(),
        best_punctuality: best.punctuality_rate_mean,
        best_date: best.date,
        worst_date: worst.date,
        worst_punctuality: worst.punctuality_rate_mean,
    })
}
