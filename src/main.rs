// Command-line entry point.
//
// Loads the raw punctuality table, runs the metrics pipeline, replaces the
// processed output and prints a short summary. `--analysis` adds operator
// rankings, seasonal patterns and the disruption comparison.
use anyhow::{Context, Result};
use clap::Parser;
use punctuality_insights::loader::{describe_source, load_records};
use punctuality_insights::output::{preview_table, write_csv_atomic, write_json};
use punctuality_insights::reports::summarize;
use punctuality_insights::types::{AnalysisReport, ProcessingSummary};
use punctuality_insights::util::{format_int, format_number};
use punctuality_insights::{analyze, build_punctuality_metrics, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "punctuality_insights")]
#[command(about = "Build monthly punctuality metrics for public transport operators", long_about = None)]
struct Cli {
    /// Raw daily punctuality CSV
    #[arg(short, long, default_value = "data/raw/norwegian_entur_punctuality.csv")]
    input: PathBuf,

    /// Destination of the processed table (replaced on every run)
    #[arg(short, long, default_value = "data/processed/punctuality_insights_processed.csv")]
    output: PathBuf,

    /// Optional TOML file overriding thresholds and disruption windows
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Include detailed analysis
    #[arg(short, long, default_value_t = false)]
    analysis: bool,

    /// Write the detailed analysis as JSON to this path
    #[arg(long, requires = "analysis")]
    report: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(summary: &ProcessingSummary) {
    println!("\nProcessing Summary:");
    println!("   • Total trips tracked: {}", format_int(summary.total_trips));
    println!("   • Average punctuality: {:.1}%", summary.avg_punctuality);
    println!(
        "   • Best performance: {} ({:.1}% in {})",
        summary.best_operator,
        summary.best_punctuality,
        summary.best_date.format("%B %Y")
    );
    println!(
        "   • Worst month: {} ({:.1}%)",
        summary.worst_date.format("%B %Y"),
        summary.worst_punctuality
    );
}

fn print_analysis(report: &AnalysisReport) {
    println!("\nDetailed Analysis:");

    println!("\nOperator Performance Rankings:");
    for row in report.rankings.iter().take(3) {
        println!(
            "   {}. {} ({}): {:.1} score, {:.1}% punctuality",
            row.performance_rank, row.operator, row.region, row.performance_score, row.avg_punctuality
        );
    }
    preview_table("Rankings", &report.rankings, 10);

    println!("\nSeasonal Performance:");
    for s in &report.season_overview {
        println!("   • {}: {:.1}% average punctuality", s.season, s.punctuality);
    }
    preview_table("Best season per operator", &report.seasonal.best, 20);
    preview_table("Worst season per operator", &report.seasonal.worst, 20);

    let d = &report.disruption;
    let pct = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |x| format!("{:.1}%", x));
    println!("\nDisruption Impact Analysis:");
    println!("   • Pre-disruption punctuality: {}", pct(d.pre_mean));
    println!("   • Disruption period punctuality: {}", pct(d.during_mean));
    println!("   • Post-disruption punctuality: {}", pct(d.post_mean));
    println!("   • Disruption impact: {}%", format_number(d.impact_pct, 1));
    println!("   • Recovery: {}%", format_number(d.recovery_pct, 1));
    println!(
        "   • Service improvement achieved: {}",
        if d.improved { "Yes" } else { "No" }
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let source = load_records(&cli.input)
        .with_context(|| format!("loading raw data from {}", cli.input.display()))?;

    if cli.verbose {
        let desc = describe_source(&source);
        println!("Raw data loaded: {} records", format_int(desc.rows));
        println!(
            "Date range: {} to {}",
            desc.first_date.as_deref().unwrap_or("-"),
            desc.last_date.as_deref().unwrap_or("-")
        );
        println!("Regions: {}", desc.regions.join(", "));
        println!("Operators: {}", desc.operators.join(", "));
        match desc.route_count {
            Some(n) => println!("Routes tracked: {}", format_int(n)),
            None => println!("Routes tracked: N/A"),
        }
    }

    let processed = build_punctuality_metrics(&source.records, &config)?;
    write_csv_atomic(&cli.output, &processed)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    let summary = summarize(&processed);
    info!(
        records = processed.len(),
        operators = summary.as_ref().map_or(0, |s| s.operator_count),
        output = %cli.output.display(),
        "Processed punctuality data saved"
    );

    if cli.verbose {
        if let Some(summary) = &summary {
            print_summary(summary);
        }
    }

    if cli.analysis {
        let report = analyze(&processed, &config);
        print_analysis(&report);
        if let Some(path) = &cli.report {
            write_json(path, &report).with_context(|| format!("writing {}", path.display()))?;
            println!("\n(Full analysis exported to {})", path.display());
        }
    }

    Ok(())
}
