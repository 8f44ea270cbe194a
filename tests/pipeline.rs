use punctuality_insights::loader::{load_records, read_records};
use punctuality_insights::output::write_csv_atomic;
use punctuality_insights::types::{ClassifiedRecord, ServiceGrade};
use punctuality_insights::{analyze, build_punctuality_metrics, PipelineConfig, PipelineError};
use std::collections::HashSet;
use std::fs;

const HEADER: &str = "date,region,operator,scheduled_trips,on_time_trips,delayed_trips,avg_delay_minutes,punctuality_rate,passenger_impact_score";

fn line(date: &str, region: &str, operator: &str, scheduled: u32, on_time: u32, punct: f64) -> String {
    format!(
        "{date},{region},{operator},{scheduled},{on_time},{},2.0,{punct},1.5",
        scheduled - on_time
    )
}

fn table(lines: &[String]) -> String {
    let mut s = String::from(HEADER);
    s.push('\n');
    for l in lines {
        s.push_str(l);
        s.push('\n');
    }
    s
}

fn run(csv: &str) -> Vec<ClassifiedRecord> {
    let source = read_records(csv.as_bytes()).unwrap();
    build_punctuality_metrics(&source.records, &PipelineConfig::default()).unwrap()
}

fn sample() -> String {
    table(&[
        line("2020-01-01", "North", "A", 100, 90, 90.0),
        line("2020-01-01", "North", "A", 100, 80, 80.0),
        line("2020-01-01", "South", "B", 200, 150, 75.0),
        line("2020-02-01", "North", "A", 100, 95, 95.0),
        line("2020-02-01", "South", "B", 0, 0, 0.0),
        line("2020-03-01", "North", "A", 100, 70, 70.0),
        line("2020-04-01", "North", "A", 100, 88, 88.0),
        line("2021-01-01", "North", "A", 100, 92, 92.0),
    ])
}

#[test]
fn output_has_one_row_per_distinct_key() {
    let csv = sample();
    let source = read_records(csv.as_bytes()).unwrap();
    let keys: HashSet<(String, String, String)> = source
        .records
        .iter()
        .map(|r| (r.date.clone(), r.region.clone(), r.operator.clone()))
        .collect();
    let out = build_punctuality_metrics(&source.records, &PipelineConfig::default()).unwrap();
    assert_eq!(out.len(), keys.len());
    assert_eq!(out.len(), 7);
}

#[test]
fn zero_schedule_leaves_reliability_undefined() {
    let out = run(&sample());
    for r in &out {
        if r.scheduled_trips_total == 0 {
            assert_eq!(r.service_reliability, None);
        } else {
            assert!(r.service_reliability.is_some());
        }
    }
    assert!(out.iter().any(|r| r.scheduled_trips_total == 0));
}

#[test]
fn series_start_at_zero_improvement_and_trend_is_centered() {
    let out = run(&sample());
    let a: Vec<&ClassifiedRecord> = out.iter().filter(|r| r.operator == "A").collect();
    let b: Vec<&ClassifiedRecord> = out.iter().filter(|r| r.operator == "B").collect();

    assert_eq!(a[0].punctuality_improvement, 0.0);
    assert_eq!(b[0].punctuality_improvement, 0.0);

    // A: 85, 95, 70, 88, 92
    assert_eq!(a[0].punctuality_trend, None);
    assert_eq!(a[1].punctuality_trend, Some(83.3));
    assert_eq!(a[2].punctuality_trend, Some(84.3));
    assert_eq!(a[3].punctuality_trend, Some(83.3));
    assert_eq!(a[4].punctuality_trend, None);

    // B has only two observations.
    assert!(b.iter().all(|r| r.punctuality_trend.is_none()));

    // January 2021 against January 2020: (92 - 85) / 85
    assert_eq!(a[4].yoy_punctuality_change, 8.2);
    assert_eq!(a[4].disruption_flag, 0);
    assert_eq!(a[2].disruption_flag, 1);
}

#[test]
fn two_month_scenario_changes_grade() {
    let out = run(&table(&[
        line("2021-01-01", "North", "A", 100, 90, 90.0),
        line("2021-02-01", "North", "A", 100, 95, 95.0),
    ]));
    assert_eq!(out.len(), 2);
    assert_eq!(out[1].punctuality_improvement, 5.0);
    assert_eq!(out[0].service_grade, ServiceGrade::Good);
    assert_eq!(out[1].service_grade, ServiceGrade::Excellent);
}

#[test]
fn bad_date_aborts_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.csv");
    fs::write(
        &input,
        table(&[
            line("2020-01-01", "North", "A", 100, 90, 90.0),
            line("01/02/2020", "North", "A", 100, 90, 90.0),
        ]),
    )
    .unwrap();

    let source = load_records(&input).unwrap();
    let err = build_punctuality_metrics(&source.records, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidDate { row: 2, .. }));
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_records(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }));
}

#[test]
fn reruns_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("raw.csv");
    fs::write(&input, sample()).unwrap();
    let out_path = dir.path().join("processed").join("out.csv");

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let source = load_records(&input).unwrap();
        let processed = build_punctuality_metrics(&source.records, &PipelineConfig::default()).unwrap();
        write_csv_atomic(&out_path, &processed).unwrap();
        outputs.push(fs::read(&out_path).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);

    let text = String::from_utf8(outputs.remove(0)).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.starts_with("date,region,operator,scheduled_trips_total"));
    assert!(header.ends_with("season,service_grade,impact_level,disruption_flag"));
    // Missing trend is an empty cell, never 0.
    let first_row = text.lines().nth(1).unwrap();
    assert!(first_row.contains(",,"));

    // The written table reads back to exactly what the pipeline produced.
    let source = load_records(&input).unwrap();
    let processed = build_punctuality_metrics(&source.records, &PipelineConfig::default()).unwrap();
    let read_back: Vec<ClassifiedRecord> = csv::Reader::from_path(&out_path)
        .unwrap()
        .deserialize()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(read_back, processed);
}

#[test]
fn config_built_in_code_is_validated() {
    let source = read_records(sample().as_bytes()).unwrap();

    let mut config = PipelineConfig::default();
    config.disruption.months = vec![13];
    let err = build_punctuality_metrics(&source.records, &config).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfig(_)));

    let mut config = PipelineConfig::default();
    config.classification.good = 99.0;
    let err = build_punctuality_metrics(&source.records, &config).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfig(_)));
}

#[test]
fn analysis_report_over_pipeline_output() {
    let out = run(&sample());
    let report = analyze(&out, &PipelineConfig::default());

    assert_eq!(report.rankings.len(), 2);
    assert_eq!(report.rankings[0].operator, "A");
    assert_eq!(report.rankings[0].performance_rank, 1);
    assert_eq!(report.rankings[1].performance_rank, 2);

    assert_eq!(report.seasonal.best.len(), 2);
    assert_eq!(report.seasonal.worst.len(), 2);

    // pre: Jan + Feb 2020 rows; during: Mar + Apr 2020; post: Jan 2021
    assert_eq!(report.disruption.during_mean, Some(79.0));
    assert_eq!(report.disruption.post_mean, Some(92.0));

    let summary = report.summary.as_ref().unwrap();
    assert_eq!(summary.record_count, 7);
    assert_eq!(summary.operator_count, 2);
    assert_eq!(summary.best_operator, "A");
    assert_eq!(summary.worst_punctuality, 0.0);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"performance_rank\":1"));
}
