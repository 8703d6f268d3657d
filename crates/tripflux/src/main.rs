use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use polars::prelude::{AnyValue, DataFrame};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tripflux_core::config::{load_config, OutputFormat, PipelineConfig};
use tripflux_core::outputs::{publish_outputs, RunManifest};
use tripflux_core::summaries::all_summaries;
use tripflux_core::validation::ValidationReport;
use tripflux_core::{build_fact_table, ingestion, run_pipeline};

#[derive(Parser, Debug)]
#[command(author, version, about = "Bike-share trip ETL and reporting pipeline", long_about = None)]
struct Cli {
    /// Human-readable logs instead of JSON
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and write the fact table, summaries and run manifest
    Run(RunArgs),
    /// Window, clean and validate without writing anything
    Validate(PipelineArgs),
    /// List the summary tables
    Summaries,
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Path to the TOML config (falls back to TRIPFLUX_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inclusive window start, RFC 3339
    #[arg(long)]
    window_start: Option<DateTime<Utc>>,

    /// Exclusive window end, RFC 3339
    #[arg(long)]
    window_end: Option<DateTime<Utc>>,

    /// Input glob; repeat to read several. Replaces [input] paths from the config
    #[arg(long = "input")]
    inputs: Vec<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// parquet or csv
    #[arg(long)]
    format: Option<OutputFormat>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.pretty);

    match cli.command {
        Command::Run(args) => run(args),
        Command::Validate(args) => validate(args),
        Command::Summaries => {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["table", "description"]);
            for summary in all_summaries() {
                table.add_row(vec![summary.name, summary.description]);
            }
            println!("{table}");
            Ok(())
        }
    }
}

fn init_tracing(pretty: bool) {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if pretty {
        builder.init();
    } else {
        builder.json().init();
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = resolve_config(&args.pipeline)?;
    if let Some(dir) = args.output_dir {
        config.output.directory = dir;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    let tz = config.calendar.tz()?;

    let ingested = ingestion::ingest(&config.input).context("failed to ingest input files")?;
    let run = run_pipeline(&ingested.dataframe, &config.window, tz)?;

    let manifest = RunManifest::new(
        &run,
        config.window,
        &config.calendar.timezone,
        config.output.format,
        ingested.files,
    );
    let published = publish_outputs(
        &config.output.directory,
        config.output.format,
        &run.tables(),
        &manifest,
    )?;
    info!(
        run_id = %published.run_id,
        manifest = %published.manifest_path.display(),
        "run finished"
    );

    print_report(&run.fact.validation);
    if let Some(stats) = run.summaries.iter().find(|t| t.name == "member_stats") {
        println!("{}", render_dataframe(&stats.dataframe)?);
    }
    Ok(())
}

fn validate(args: PipelineArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let tz = config.calendar.tz()?;

    let ingested = ingestion::ingest(&config.input).context("failed to ingest input files")?;
    let fact = build_fact_table(&ingested.dataframe, &config.window, tz)?;

    println!(
        "raw rows: {}, windowed: {}, cleaned: {}",
        fact.stages.raw_rows, fact.stages.window.kept_rows, fact.stages.cleaning.retained_rows
    );
    print_report(&fact.validation);
    Ok(())
}

fn resolve_config(args: &PipelineArgs) -> Result<PipelineConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => std::env::var("TRIPFLUX_CONFIG")
            .map(PathBuf::from)
            .context("--config or TRIPFLUX_CONFIG must be set")?,
    };
    let mut config = load_config(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;

    if let Some(start) = args.window_start {
        config.window.start = start;
    }
    if let Some(end) = args.window_end {
        config.window.end = end;
    }
    if !args.inputs.is_empty() {
        config.input.paths = args.inputs.clone();
    }
    config.validate()?;
    Ok(config)
}

fn print_report(report: &ValidationReport) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["check", "value", "expected"]);
    table.add_row(vec![
        "distinct months".to_string(),
        report.month_coverage.distinct_months.to_string(),
        report.month_coverage.expected_months.to_string(),
    ]);
    let leakage = &report.boundary_leakage;
    table.add_row(vec![
        "ended_at <= started_at".to_string(),
        leakage.non_positive_duration.to_string(),
        "0".to_string(),
    ]);
    table.add_row(vec![
        "ride_length_minutes <= 1".to_string(),
        leakage.too_short.to_string(),
        "0".to_string(),
    ]);
    table.add_row(vec![
        "duration hours >= 24".to_string(),
        leakage.too_long.to_string(),
        "0".to_string(),
    ]);
    table.add_row(vec![
        "duplicated ride ids".to_string(),
        report.duplicate_ids.duplicated_ids.to_string(),
        "0".to_string(),
    ]);
    println!("{table}");

    for warning in report.warnings() {
        warn!("{warning}");
    }
}

fn render_dataframe(df: &DataFrame) -> Result<Table> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(
        df.get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>(),
    );
    for idx in 0..df.height() {
        let mut row = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let cell = match column.get(idx)? {
                AnyValue::Null => String::new(),
                AnyValue::String(value) => value.to_string(),
                other => other.to_string(),
            };
            row.push(cell);
        }
        table.add_row(row);
    }
    Ok(table)
}
