use crate::error::{PipelineError, Result};
use crate::types::RawRecord;
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Columns every source table must carry, in canonical order.
pub static REQUIRED_COLUMNS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "date",
        "region",
        "operator",
        "scheduled_trips",
        "on_time_trips",
        "delayed_trips",
        "avg_delay_minutes",
        "punctuality_rate",
        "passenger_impact_score",
    ]
});

const ROUTE_COLUMN: &str = "route_id";

#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub records: Vec<RawRecord>,
    /// Distinct `route_id` values, when the optional column is present.
    pub route_count: Option<usize>,
}

/// What the source contains, for the verbose console report.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescription {
    pub rows: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub regions: Vec<String>,
    pub operators: Vec<String>,
    pub route_count: Option<usize>,
}

pub fn load_records(path: &Path) -> Result<LoadedSource> {
    let file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let source = read_records(file)?;
    info!(path = %path.display(), rows = source.records.len(), "Loaded raw records");
    Ok(source)
}

/// Reads a headered CSV table of raw records.
///
/// A missing required column or a row that fails to deserialize aborts the
/// whole load; nothing partial is returned.
pub fn read_records<R: Read>(reader: R) -> Result<LoadedSource> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let present: HashSet<&str> = headers.iter().collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingColumns(missing));
    }

    let route_idx = headers.iter().position(|h| h == ROUTE_COLUMN);
    let mut routes: BTreeSet<String> = BTreeSet::new();
    let mut records = Vec::new();

    for result in rdr.records() {
        let row = result?;
        if let Some(value) = route_idx.and_then(|i| row.get(i)) {
            if !value.is_empty() {
                routes.insert(value.to_string());
            }
        }
        let record: RawRecord = row.deserialize(Some(&headers))?;
        records.push(record);
    }

    debug!(
        rows = records.len(),
        has_routes = route_idx.is_some(),
        "Parsed source table"
    );
    Ok(LoadedSource {
        records,
        route_count: route_idx.map(|_| routes.len()),
    })
}

pub fn describe_source(source: &LoadedSource) -> SourceDescription {
    // ISO dates order lexically, so text min/max is the calendar min/max.
    let first_date = source.records.iter().map(|r| r.date.as_str()).min();
    let last_date = source.records.iter().map(|r| r.date.as_str()).max();

    let mut regions: Vec<String> = Vec::new();
    let mut operators: Vec<String> = Vec::new();
    for r in &source.records {
        if !regions.contains(&r.region) {
            regions.push(r.region.clone());
        }
        if !operators.contains(&r.operator) {
            operators.push(r.operator.clone());
        }
    }

    SourceDescription {
        rows: source.records.len(),
        first_date: first_date.map(str::to_string),
        last_date: last_date.map(str::to_string),
        regions,
        operators,
        route_count: source.route_count,
    }
}
