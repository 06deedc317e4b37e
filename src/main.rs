//! CLI entry point for the shuttle fleet planner.
//!
//! Provides subcommands for planning a fleet from an observation source,
//! inspecting a single (time block, weekday) cell, and generating sample data.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use shuttle_planner::analyzers::summary::DatasetSummary;
use shuttle_planner::analyzers::{Aggregation, aggregate, aggregate_parallel, drill_down, plan};
use shuttle_planner::config::PlannerConfig;
use shuttle_planner::model::{CellKey, Observation, WEEKDAYS, parse_weekday};
use shuttle_planner::output::{
    PlanReport, log_drill_down, log_plan_summary, write_observations_csv, write_plan_csv,
    write_plan_json,
};
use shuttle_planner::sample::SampleGenerator;
use shuttle_planner::source::source_for;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "shuttle_planner")]
#[command(about = "Estimate crew-shuttle fleet size and monthly cost from passenger counts", long_about = None)]
struct Cli {
    /// JSON config file with capacity and cost policy
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Hourly rate per shuttle, clamped to the configured range
    #[arg(long, global = true)]
    hourly_rate: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate observations and compute the fleet plan
    Plan {
        /// CSV file, http(s) URL, or "sample"
        #[arg(value_name = "SOURCE", default_value = "sample")]
        source: String,

        /// Write the full report as JSON
        #[arg(long)]
        json: Option<String>,

        /// Write the per-cell shuttle table as CSV
        #[arg(long)]
        csv: Option<String>,

        /// Gzip the CSV output
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Aggregate on all cores
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Show demand, shuttles and pickup-location breakdown for one cell
    DrillDown {
        /// CSV file, http(s) URL, or "sample"
        #[arg(value_name = "SOURCE", default_value = "sample")]
        source: String,

        /// Time block start, e.g. 07:30
        #[arg(short, long)]
        time_block: String,

        /// Weekday name, e.g. Monday
        #[arg(short, long)]
        day: String,
    },
    /// Generate synthetic observations as CSV
    Sample {
        /// CSV file to write
        #[arg(short, long, default_value = "observations.csv")]
        output: String,

        /// Month to generate, YYYY-MM
        #[arg(short, long, default_value = "2024-01")]
        month: String,

        /// Number of days from the 1st
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/shuttle_planner.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("shuttle_planner.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.hourly_rate)?;

    match cli.command {
        Commands::Plan {
            source,
            json,
            csv,
            gzip,
            parallel,
        } => {
            run_plan(&config, &source, json, csv, gzip, parallel).await?;
        }
        Commands::DrillDown {
            source,
            time_block,
            day,
        } => {
            run_drill_down(&config, &source, &time_block, &day).await?;
        }
        Commands::Sample {
            output,
            month,
            days,
            seed,
        } => {
            let generator = SampleGenerator {
                days,
                seed,
                grid: config.grid()?,
                ..SampleGenerator::for_month(&month)?
            };
            let rows = generator.generate()?;
            write_observations_csv(&output, &rows)?;
            info!(output = %output, rows = rows.len(), "Sample data written");
        }
    }

    Ok(())
}

/// Defaults, then the config file, then environment, then CLI flags.
fn load_config(path: Option<&str>, hourly_rate: Option<f64>) -> Result<PlannerConfig> {
    let mut config = match path {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    config.apply_env()?;
    if let Some(rate) = hourly_rate {
        config.set_hourly_rate(rate);
    }
    Ok(config)
}

async fn load_and_aggregate(
    config: &PlannerConfig,
    source: &str,
    parallel: bool,
) -> Result<(Vec<Observation>, Aggregation)> {
    let observations = source_for(source)?.load().await?;
    let blocks = config.grid()?.blocks();

    let aggregation = if parallel {
        aggregate_parallel(&observations, &WEEKDAYS, &blocks)
    } else {
        aggregate(&observations, &WEEKDAYS, &blocks)
    };
    info!(
        observations = observations.len(),
        rejected = aggregation.rejected.len(),
        "Observations aggregated"
    );
    Ok((observations, aggregation))
}

#[tracing::instrument(skip_all, fields(source = %source, parallel = parallel))]
async fn run_plan(
    config: &PlannerConfig,
    source: &str,
    json: Option<String>,
    csv: Option<String>,
    gzip: bool,
    parallel: bool,
) -> Result<()> {
    let (observations, aggregation) = load_and_aggregate(config, source, parallel).await?;

    let fleet = plan(&aggregation.table, &config.capacity, &config.cost)?;
    let summary = DatasetSummary::from_observations(&observations, &aggregation.table);
    let report = PlanReport::new(
        &aggregation,
        &fleet,
        &summary,
        &config.capacity,
        &config.cost,
    );

    log_plan_summary(&report);

    if let Some(path) = json {
        write_plan_json(&path, &report)?;
        info!(path = %path, "Plan report written");
    }
    if let Some(path) = csv {
        write_plan_csv(&path, &report, gzip)?;
        info!(path = %path, gzip, "Shuttle table written");
    }
    Ok(())
}

#[tracing::instrument(skip_all, fields(source = %source, time_block = %time_block, day = %day))]
async fn run_drill_down(
    config: &PlannerConfig,
    source: &str,
    time_block: &str,
    day: &str,
) -> Result<()> {
    let key = CellKey::new(
        time_block.parse()?,
        parse_weekday(day).ok_or_else(|| anyhow!("unrecognized weekday {day:?}"))?,
    );

    let (observations, aggregation) = load_and_aggregate(config, source, false).await?;
    let fleet = plan(&aggregation.table, &config.capacity, &config.cost)?;

    let view = drill_down(&key, &aggregation.table, &fleet, Some(&observations))
        .with_context(|| format!("{key} is not on the configured time grid"))?;

    log_drill_down(&view);
    Ok(())
}
