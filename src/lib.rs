//! # Quickcast
//!
//! Sales forecasting for quick-service restaurant stores.
//!
//! This crate bundles the workspace members:
//!
//! - [`slot_math`]: rolling statistics keyed by weekday and time of day
//! - [`sales_forecast`]: expanding-window forecasters, store datasets and
//!   what-if scenarios
//!
//! ## Example
//!
//! ```
//! use chrono::{Duration, NaiveDate};
//! use quickcast_workspace::sales_forecast::{forecast_sma, TimeSeries};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1)
//!     .unwrap()
//!     .and_hms_opt(0, 0, 0)
//!     .unwrap();
//! let history = TimeSeries::regular(start, Duration::minutes(30), vec![1.0; 4 * 336]).unwrap();
//!
//! let forecast = forecast_sma(&history, 4, None).unwrap();
//! assert_eq!(forecast.len(), 336);
//! assert!(forecast.values().iter().all(|v| *v == Some(1.0)));
//! ```

pub use sales_forecast;
pub use slot_math;

pub use sales_forecast::{
    forecast_gbm, forecast_last_week, forecast_sma, ForecastConfig, ForecastError, SalesTable,
    TimeSeries,
};
pub use slot_math::{SlotKey, SlotWindower};
