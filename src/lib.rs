//! Public-transport punctuality analytics.
//!
//! Turns daily per-operator, per-region punctuality observations into a
//! classified monthly table, plus optional rankings, seasonal profiles and a
//! before/after comparison around a disruption period.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod disruption;
pub mod enrich;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod reports;
pub mod types;
pub mod util;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::build_punctuality_metrics;

use types::{AnalysisReport, ClassifiedRecord};

/// Run every read-only report over the classified table.
pub fn analyze(data: &[ClassifiedRecord], config: &PipelineConfig) -> AnalysisReport {
    let seasonal = reports::seasonal_analysis(data);
    let season_overview = reports::season_overview(&seasonal.profiles);
    AnalysisReport {
        summary: reports::summarize(data),
        rankings: reports::rank_operators(data),
        seasonal,
        season_overview,
        disruption: disruption::disruption_impact(data, &config.disruption),
    }
}
