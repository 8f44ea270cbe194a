use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

use crate::util::display_opt;

/// One daily punctuality observation for a (region, operator) pair.
///
/// `date` is kept as the source text; the enricher owns parsing it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawRecord {
    pub date: String,
    pub region: String,
    pub operator: String,
    pub scheduled_trips: u32,
    pub on_time_trips: u32,
    pub delayed_trips: u32,
    pub avg_delay_minutes: f64,
    pub punctuality_rate: f64,
    pub passenger_impact_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub date: NaiveDate,
    pub region: String,
    pub operator: String,
    pub scheduled_trips: u32,
    pub on_time_trips: u32,
    pub delayed_trips: u32,
    pub avg_delay_minutes: f64,
    pub punctuality_rate: f64,
    pub passenger_impact_score: f64,
    pub year: i32,
    pub month: u32,
    pub season: Season,
}

/// Reductions of one (date, region, operator) group, rounded to one decimal.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAggregate {
    pub date: NaiveDate,
    pub region: String,
    pub operator: String,
    pub year: i32,
    pub month: u32,
    pub season: Season,
    pub scheduled_trips_total: u64,
    pub scheduled_trips_mean: f64,
    pub on_time_trips_total: u64,
    pub on_time_trips_mean: f64,
    pub delayed_trips_total: u64,
    pub delayed_trips_mean: f64,
    pub avg_delay_mean: f64,
    pub avg_delay_max: f64,
    pub punctuality_rate_mean: f64,
    pub punctuality_rate_min: f64,
    pub punctuality_rate_max: f64,
    pub passenger_impact_mean: f64,
    pub passenger_impact_total: f64,
}

/// Series-relative metrics for one aggregate row.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedMetrics {
    pub punctuality_improvement: f64,
    /// `None` when the row has no scheduled trips.
    pub service_reliability: Option<f64>,
    pub delay_consistency: f64,
    /// `None` where the centered window does not fit.
    pub punctuality_trend: Option<f64>,
    pub yoy_punctuality_change: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub aggregate: MonthlyAggregate,
    pub metrics: DerivedMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceGrade {
    Excellent,
    Good,
    Acceptable,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    Poor,
}

impl fmt::Display for ServiceGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceGrade::Excellent => "Excellent",
            ServiceGrade::Good => "Good",
            ServiceGrade::Acceptable => "Acceptable",
            ServiceGrade::NeedsImprovement => "Needs Improvement",
            ServiceGrade::Poor => "Poor",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImpactLevel::Low => "Low",
            ImpactLevel::Moderate => "Moderate",
            ImpactLevel::High => "High",
            ImpactLevel::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// One row of the persisted output table. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub date: NaiveDate,
    pub region: String,
    pub operator: String,
    pub scheduled_trips_total: u64,
    pub scheduled_trips_mean: f64,
    pub on_time_trips_total: u64,
    pub on_time_trips_mean: f64,
    pub delayed_trips_total: u64,
    pub delayed_trips_mean: f64,
    pub avg_delay_mean: f64,
    pub avg_delay_max: f64,
    pub punctuality_rate_mean: f64,
    pub punctuality_rate_min: f64,
    pub punctuality_rate_max: f64,
    pub passenger_impact_mean: f64,
    pub passenger_impact_total: f64,
    pub punctuality_improvement: f64,
    pub service_reliability: Option<f64>,
    pub delay_consistency: f64,
    pub year: i32,
    pub month: u32,
    pub punctuality_trend: Option<f64>,
    pub yoy_punctuality_change: f64,
    pub season: Season,
    pub service_grade: ServiceGrade,
    pub impact_level: ImpactLevel,
    pub disruption_flag: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct OperatorRanking {
    #[tabled(rename = "Rank")]
    pub performance_rank: u32,
    #[tabled(rename = "Operator")]
    pub operator: String,
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "AvgPunctuality")]
    pub avg_punctuality: f64,
    #[tabled(rename = "PunctualityStd", display_with = "display_opt")]
    pub punctuality_std: Option<f64>,
    #[tabled(rename = "Worst")]
    pub worst_punctuality: f64,
    #[tabled(rename = "Best")]
    pub best_punctuality: f64,
    #[tabled(rename = "AvgImpact")]
    pub avg_impact: f64,
    #[tabled(skip)]
    pub impact_std: Option<f64>,
    #[tabled(rename = "TotalTrips")]
    pub total_trips: u64,
    #[tabled(skip)]
    pub avg_monthly_trips: f64,
    #[tabled(rename = "AvgReliability", display_with = "display_opt")]
    pub avg_reliability: Option<f64>,
    #[tabled(rename = "AvgConsistency")]
    pub avg_consistency: f64,
    #[tabled(rename = "Score")]
    pub performance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SeasonalProfile {
    #[tabled(rename = "Season")]
    pub season: Season,
    #[tabled(rename = "Operator")]
    pub operator: String,
    #[tabled(rename = "Punctuality")]
    pub punctuality: f64,
    #[tabled(rename = "PunctualityStd", display_with = "display_opt")]
    pub punctuality_std: Option<f64>,
    #[tabled(rename = "Impact")]
    pub impact: f64,
    #[tabled(rename = "Delay")]
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalAnalysis {
    pub profiles: Vec<SeasonalProfile>,
    pub best: Vec<SeasonalProfile>,
    pub worst: Vec<SeasonalProfile>,
}

/// Mean punctuality across operators for one season.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct SeasonOverview {
    #[tabled(rename = "Season")]
    pub season: Season,
    #[tabled(rename = "AvgPunctuality")]
    pub punctuality: f64,
}

/// Before / during / after comparison around the disruption period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisruptionImpact {
    pub pre_mean: Option<f64>,
    pub during_mean: Option<f64>,
    pub post_mean: Option<f64>,
    pub impact_pct: f64,
    pub recovery_pct: f64,
    pub improved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingSummary {
    pub record_count: usize,
    pub operator_count: usize,
    pub total_trips: u64,
    pub avg_punctuality: f64,
    pub best_operator: String,
    pub best_punctuality: f64,
    pub best_date: NaiveDate,
    pub worst_date: NaiveDate,
    pub worst_punctuality: f64,
}

/// Everything the extended analysis produces, serialized as one JSON file.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub summary: Option<ProcessingSummary>,
    pub rankings: Vec<OperatorRanking>,
    pub seasonal: SeasonalAnalysis,
    pub season_overview: Vec<SeasonOverview>,
    pub disruption: DisruptionImpact,
}
