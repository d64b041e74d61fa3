//! # Sales Forecast
//!
//! Expanding-window forecasting of half-hourly sales for quick-service
//! restaurant stores.
//!
//! ## Features
//!
//! - Seasonal moving average over the same weekday and time of day
//! - "Same time last week" forecast
//! - Recursive gradient-boosted forecast with calendar, lag and business
//!   features (promotion, air pollution) that can be overridden over the horizon
//! - Store datasets from CSV or Parquet via polars
//! - What-if scenarios for a store week, with per-group error metrics
//!
//! Every forecaster extends the series one week at a time until the
//! requested dates are covered, so a forecast never looks at values at or
//! after the point being forecast.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use sales_forecast::data::StoreDataset;
//! use sales_forecast::scenario::{run_scenario, ForecastStoreRequest, ScenarioInputs};
//! use sales_forecast::ForecastConfig;
//!
//! # fn main() -> sales_forecast::Result<()> {
//! let dataset = StoreDataset::from_path("sales.csv")?;
//! let week = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
//!
//! let request = ForecastStoreRequest::for_week("001", week)?;
//! let inputs = ScenarioInputs::new(request, true, 2)?;
//! let result = run_scenario(&dataset, &inputs, &ForecastConfig::default())?;
//!
//! for group in result.metrics() {
//!     println!("{} / {}: {:?}", group.section, group.indicator, group.mse_sma);
//! }
//! # Ok(())
//! # }
//! ```

pub mod boosted;
pub mod config;
pub mod data;
pub mod error;
pub mod expanding;
pub mod features;
pub mod metrics;
pub mod models;
pub mod scenario;
pub mod series;
pub mod utils;

// Re-export commonly used types
pub use crate::boosted::{forecast_gbm, BoostedForecaster, FeatureOverrides, FittedBoostedForecaster};
pub use crate::config::ForecastConfig;
pub use crate::error::{ForecastError, Result};
pub use crate::expanding::{forecast_last_week, forecast_sma, Coverage, ExpandingDriver, WindowedForecaster};
pub use crate::features::FeatureEngineer;
pub use crate::metrics::{forecast_accuracy, ForecastAccuracy};
pub use crate::series::{SalesTable, TimeSeries};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
