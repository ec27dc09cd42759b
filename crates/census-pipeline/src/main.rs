//! CLI entry point for the census batch pipeline.

use anyhow::Result;
use census_pipeline::{
    MissingFallbackPolicy, Pipeline, PipelineConfig, PipelineReport, SourceConfig, StageEvent,
};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Census batch pipeline: fetch, impute, filter, load, summarize",
    long_about = "Fetches a census CSV, fills missing weights from (state, age) group medians,\n\
                  keeps rows with age above a threshold in one state, replaces a SQLite table\n\
                  and prints summary statistics.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  CENSUS_SOURCE_URL    URL of the census CSV\n  \
                  CENSUS_DATABASE      SQLite database file\n  \
                  RUST_LOG             Overrides --log-level\n\n\
                  EXAMPLES:\n  \
                  # Default source and database\n  \
                  census-pipeline\n\n  \
                  # Local file, keep staged CSVs\n  \
                  census-pipeline -i city_census.csv --staging-dir staging\n\n  \
                  # Machine-readable report\n  \
                  census-pipeline --json | jq .summary"
)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// URL of the census CSV
    #[arg(long, env = "CENSUS_SOURCE_URL")]
    source_url: Option<String>,

    /// Read the census CSV from a local file instead of the network (wins over --source-url)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Request timeout for the source in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// SQLite database file
    #[arg(short, long, env = "CENSUS_DATABASE")]
    database: Option<PathBuf>,

    /// Table to replace
    #[arg(short, long)]
    table: Option<String>,

    /// Write city_census.csv and filtered_census.csv to this directory
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Keep rows with age strictly greater than this
    #[arg(long)]
    min_age: Option<i64>,

    /// Keep rows of this state
    #[arg(long)]
    state: Option<String>,

    /// Leave weights null when none is known anywhere, instead of failing
    #[arg(long)]
    leave_null: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the JSON report to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the report (or error) is written.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Merge the configuration file (or defaults) with command-line overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(path) = &args.input {
        config.source = SourceConfig::File { path: path.clone() };
    } else if let Some(url) = &args.source_url {
        let timeout_secs = match &config.source {
            SourceConfig::Http { timeout_secs, .. } => *timeout_secs,
            SourceConfig::File { .. } => census_pipeline::config::DEFAULT_TIMEOUT_SECS,
        };
        config.source = SourceConfig::Http {
            url: url.clone(),
            timeout_secs,
        };
    }
    if let (Some(timeout), SourceConfig::Http { timeout_secs, .. }) =
        (args.timeout, &mut config.source)
    {
        *timeout_secs = timeout;
    }

    if let Some(database) = &args.database {
        config.database_path = database.clone();
    }
    if let Some(table) = &args.table {
        config.table_name = table.clone();
    }
    if let Some(dir) = &args.staging_dir {
        config.staging_dir = Some(dir.clone());
    }
    if let Some(min_age) = args.min_age {
        config.filter.min_age = min_age;
    }
    if let Some(state) = &args.state {
        config.filter.state = state.clone();
    }
    if args.leave_null {
        config.missing_fallback = MissingFallbackPolicy::LeaveNull;
        config.require_complete_weight = false;
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(report: &PipelineReport) {
    println!("\n{}", "=".repeat(60));
    println!("CENSUS PIPELINE SUMMARY");
    println!("{}", "=".repeat(60));
    println!("  Started:            {}", report.started_at.to_rfc3339());
    println!("  Duration:           {} ms", report.duration_ms);
    println!("  Rows fetched:       {}", report.rows_fetched);
    println!(
        "  Weights imputed:    {} (group: {}, global: {})",
        report.imputation.total_filled(),
        report.imputation.filled_from_group,
        report.imputation.filled_from_global
    );
    if report.imputation.left_null > 0 {
        println!("  Weights left null:  {}", report.imputation.left_null);
    }
    println!("  Rows after filter:  {}", report.rows_after_filter);
    println!(
        "  Rows loaded:        {} (table '{}')",
        report.rows_loaded, report.table_name
    );
    for path in &report.staged_files {
        println!("  Staged:             {}", path.display());
    }
    println!("{}", "-".repeat(60));
    println!("  mean_age:           {:.4}", report.summary.mean_age);
    println!("  mean_weight:        {:.4}", report.summary.mean_weight);
    println!("  total_rows:         {}", report.summary.total_rows);
    println!("{}", "=".repeat(60));
}

fn main() -> Result<()> {
    // clap reads CENSUS_* variables at parse time, so .env must be loaded first
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;

    let mut builder = Pipeline::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_event(|event: &StageEvent| {
            info!(
                "[{:.0}%] {}: {}",
                event.progress * 100.0,
                event.stage.display_name(),
                event.message
            );
        });
    }
    let mut pipeline = builder.build()?;

    match pipeline.run() {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
            Ok(())
        }
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            } else {
                error!(
                    "Pipeline failed [{}] (retryable: {})",
                    e.error_code(),
                    e.is_retryable()
                );
            }
            Err(e.into())
        }
    }
}
