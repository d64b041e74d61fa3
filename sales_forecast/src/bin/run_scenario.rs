//! Forecast one store week and compare the forecasts with recorded sales

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use sales_forecast::data::StoreDataset;
use sales_forecast::scenario::{run_scenario, ForecastStoreRequest, ScenarioInputs};
use sales_forecast::ForecastConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "run_scenario")]
#[command(about = "Run a what-if sales forecast for one store week")]
struct Args {
    /// Store dataset (CSV or Parquet)
    #[arg(short, long)]
    data: PathBuf,

    /// Store identifier
    #[arg(short, long)]
    store: String,

    /// Monday starting the forecast week (YYYY-MM-DD)
    #[arg(short, long)]
    week_start: NaiveDate,

    /// Run a promotion over the forecast week
    #[arg(long)]
    promo: bool,

    /// Air pollution level over the forecast week (0-5)
    #[arg(long, default_value = "0")]
    pollution: u8,

    /// JSON forecast configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the scenario rows to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ForecastConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ForecastConfig::default(),
    };

    let dataset = StoreDataset::from_path(&args.data)
        .with_context(|| format!("loading dataset {}", args.data.display()))?;
    info!(rows = dataset.len(), path = %args.data.display(), "dataset loaded");

    let request = ForecastStoreRequest::for_week(args.store.as_str(), args.week_start)?;
    let inputs = ScenarioInputs::new(request, args.promo, args.pollution)?;
    let result = run_scenario(&dataset, &inputs, &config)?;

    if let Some(path) = &args.output {
        result
            .write_csv(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(rows = result.len(), path = %path.display(), "scenario written");
    }

    let fmt_mse = |mse: Option<f64>| mse.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v));
    println!("{:<20} {:<20} {:>12} {:>12}", "section", "indicator", "mse_sma", "mse_gbm");
    for group in result.metrics() {
        println!(
            "{:<20} {:<20} {:>12} {:>12}",
            group.section,
            group.indicator,
            fmt_mse(group.mse_sma),
            fmt_mse(group.mse_gbm)
        );
    }

    Ok(())
}
