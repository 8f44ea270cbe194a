//! Pipeline configuration.
//!
//! Every calendar boundary and classification cut-off lives here rather than
//! in the stages, so the core can be exercised against synthetic date ranges.
//! All fields default to the historical values; a TOML file may override any
//! subset of them.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::error::{PipelineError, Result};

pub const DEFAULT_DISRUPTION_YEAR: i32 = 2020;
pub const DEFAULT_DISRUPTION_MONTHS: [u32; 4] = [3, 4, 5, 6];
pub const DEFAULT_IMPROVEMENT_THRESHOLD: f64 = 0.02;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub classification: ClassificationThresholds,
    pub disruption: DisruptionConfig,
}

/// Lower bounds of each service grade band and upper bounds of each impact
/// band.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassificationThresholds {
    pub excellent: f64,
    pub good: f64,
    pub acceptable: f64,
    pub needs_improvement: f64,
    pub impact_moderate: f64,
    pub impact_high: f64,
    pub impact_critical: f64,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            excellent: 95.0,
            good: 85.0,
            acceptable: 75.0,
            needs_improvement: 65.0,
            impact_moderate: 1.0,
            impact_high: 2.0,
            impact_critical: 3.0,
        }
    }
}

/// The disruption period as seen by both the row flag and the window
/// comparison.
///
/// Windows: pre is `date < pre_end`, during is
/// `during_start <= date < during_end`, post is `date >= post_start`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisruptionConfig {
    pub year: i32,
    pub months: Vec<u32>,
    pub pre_end: NaiveDate,
    pub during_start: NaiveDate,
    pub during_end: NaiveDate,
    pub post_start: NaiveDate,
    pub improvement_threshold: f64,
}

impl Default for DisruptionConfig {
    fn default() -> Self {
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
        Self {
            year: DEFAULT_DISRUPTION_YEAR,
            months: DEFAULT_DISRUPTION_MONTHS.to_vec(),
            pre_end: ymd(2020, 3, 1),
            during_start: ymd(2020, 3, 1),
            during_end: ymd(2020, 7, 1),
            post_start: ymd(2021, 1, 1),
            improvement_threshold: DEFAULT_IMPROVEMENT_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), ?config, "Loaded pipeline config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.classification;
        if !(c.excellent > c.good && c.good > c.acceptable && c.acceptable > c.needs_improvement)
        {
            return Err(PipelineError::InvalidConfig(
                "grade thresholds must be strictly descending".into(),
            ));
        }
        if !(c.impact_moderate < c.impact_high && c.impact_high < c.impact_critical) {
            return Err(PipelineError::InvalidConfig(
                "impact thresholds must be strictly ascending".into(),
            ));
        }

        let d = &self.disruption;
        if let Some(m) = d.months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(PipelineError::InvalidConfig(format!(
                "disruption month {m} is outside 1..=12"
            )));
        }
        if !(d.pre_end <= d.during_start
            && d.during_start < d.during_end
            && d.during_end <= d.post_start)
        {
            return Err(PipelineError::InvalidConfig(
                "disruption windows must satisfy pre_end <= during_start < during_end <= post_start"
                    .into(),
            ));
        }
        if !(d.improvement_threshold >= 0.0) {
            return Err(PipelineError::InvalidConfig(
                "improvement_threshold must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.disruption.year, 2020);
        assert_eq!(config.disruption.months, vec![3, 4, 5, 6]);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [disruption]
            year = 2015
            months = [1, 2]
            pre_end = "2015-01-01"
            during_start = "2015-01-01"
            during_end = "2015-03-01"
            post_start = "2015-06-01"
            "#,
        )
        .unwrap();
        assert_eq!(config.disruption.year, 2015);
        assert_eq!(config.disruption.improvement_threshold, 0.02);
        assert_eq!(config.classification, ClassificationThresholds::default());
    }

    #[test]
    fn rejects_overlapping_windows() {
        let err = PipelineConfig::from_toml_str(
            r#"
            [disruption]
            pre_end = "2020-05-01"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_out_of_range_month() {
        let err = PipelineConfig::from_toml_str("[disruption]\nmonths = [13]\n").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_unsorted_grades() {
        let err =
            PipelineConfig::from_toml_str("[classification]\ngood = 99.0\n").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }
}
