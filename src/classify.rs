use crate::config::{ClassificationThresholds, DisruptionConfig};
use crate::types::{ClassifiedRecord, DerivedRecord, ImpactLevel, ServiceGrade};

/// Row-level labelling rules. Holds no state beyond its thresholds, so every
/// row is classified independently of the others.
#[derive(Debug, Clone)]
pub struct Classifier {
    thresholds: ClassificationThresholds,
    disruption_year: i32,
    disruption_months: Vec<u32>,
}

impl Classifier {
    pub fn new(thresholds: ClassificationThresholds, disruption: &DisruptionConfig) -> Self {
        Self {
            thresholds,
            disruption_year: disruption.year,
            disruption_months: disruption.months.clone(),
        }
    }

    /// Lower bound of each band is inclusive.
    ///
    /// | Punctuality | Grade             |
    /// |-------------|-------------------|
    /// | >= 95       | Excellent         |
    /// | >= 85       | Good              |
    /// | >= 75       | Acceptable        |
    /// | >= 65       | Needs Improvement |
    /// | < 65        | Poor              |
    pub fn service_grade(&self, punctuality: f64) -> ServiceGrade {
        let t = &self.thresholds;
        match punctuality {
            p if p >= t.excellent => ServiceGrade::Excellent,
            p if p >= t.good => ServiceGrade::Good,
            p if p >= t.acceptable => ServiceGrade::Acceptable,
            p if p >= t.needs_improvement => ServiceGrade::NeedsImprovement,
            _ => ServiceGrade::Poor,
        }
    }

    pub fn impact_level(&self, impact: f64) -> ImpactLevel {
        let t = &self.thresholds;
        match impact {
            i if i < t.impact_moderate => ImpactLevel::Low,
            i if i < t.impact_high => ImpactLevel::Moderate,
            i if i < t.impact_critical => ImpactLevel::High,
            _ => ImpactLevel::Critical,
        }
    }

    pub fn disruption_flag(&self, year: i32, month: u32) -> u8 {
        u8::from(year == self.disruption_year && self.disruption_months.contains(&month))
    }

    pub fn classify(&self, record: DerivedRecord) -> ClassifiedRecord {
        let DerivedRecord { aggregate: a, metrics: m } = record;
        ClassifiedRecord {
            service_grade: self.service_grade(a.punctuality_rate_mean),
            impact_level: self.impact_level(a.passenger_impact_mean),
            disruption_flag: self.disruption_flag(a.year, a.month),
            date: a.date,
            region: a.region,
            operator: a.operator,
            scheduled_trips_total: a.scheduled_trips_total,
            scheduled_trips_mean: a.scheduled_trips_mean,
            on_time_trips_total: a.on_time_trips_total,
            on_time_trips_mean: a.on_time_trips_mean,
            delayed_trips_total: a.delayed_trips_total,
            delayed_trips_mean: a.delayed_trips_mean,
            avg_delay_mean: a.avg_delay_mean,
            avg_delay_max: a.avg_delay_max,
            punctuality_rate_mean: a.punctuality_rate_mean,
            punctuality_rate_min: a.punctuality_rate_min,
            punctuality_rate_max: a.punctuality_rate_max,
            passenger_impact_mean: a.passenger_impact_mean,
            passenger_impact_total: a.passenger_impact_total,
            punctuality_improvement: m.punctuality_improvement,
            service_reliability: m.service_reliability,
            delay_consistency: m.delay_consistency,
            year: a.year,
            month: a.month,
            punctuality_trend: m.punctuality_trend,
            yoy_punctuality_change: m.yoy_punctuality_change,
            season: a.season,
        }
    }

    pub fn classify_all(&self, records: Vec<DerivedRecord>) -> Vec<ClassifiedRecord> {
        records.into_iter().map(|r| self.classify(r)).collect()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassificationThresholds::default(), &DisruptionConfig::default())
    }
}
