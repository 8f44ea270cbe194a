//! Stage orchestration: enrich, aggregate, derive, classify.
//!
//! Each stage takes the complete output of the previous one and returns a
//! new table; nothing is mutated in place and nothing runs concurrently.

use crate::aggregate::aggregate_monthly;
use crate::classify::Classifier;
use crate::config::PipelineConfig;
use crate::enrich::enrich;
use crate::error::Result;
use crate::metrics::derive_metrics;
use crate::types::{ClassifiedRecord, RawRecord};
use tracing::info;

#[tracing::instrument(skip_all, fields(rows = records.len()))]
pub fn build_punctuality_metrics(
    records: &[RawRecord],
    config: &PipelineConfig,
) -> Result<Vec<ClassifiedRecord>> {
    config.validate()?;
    let enriched = enrich(records)?;
    let monthly = aggregate_monthly(&enriched);
    let derived = derive_metrics(monthly);

    let classifier = Classifier::new(config.classification.clone(), &config.disruption);
    let classified = classifier.classify_all(derived);

    info!(
        input = records.len(),
        output = classified.len(),
        "Built punctuality metrics"
    );
    Ok(classified)
}
