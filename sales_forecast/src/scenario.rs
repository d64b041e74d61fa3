//! What-if forecast scenarios for one store and one week
//!
//! A scenario truncates the store's data at a cutoff, forecasts every
//! (section, indicator) group for the requested week with both the seasonal
//! moving average and the boosted model, and lines the forecasts up with the
//! actual values recorded for that week.

use crate::boosted::{forecast_gbm, FeatureOverrides};
use crate::config::ForecastConfig;
use crate::data::{group_tables, SalesRecord, StoreDataset, INDICATOR, SECTION, START_TIME, VALUE};
use crate::error::{ForecastError, Result};
use crate::expanding::WindowedForecaster;
use crate::metrics::mean_squared_error;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

pub const FORECAST_SMA: &str = "forecast_sma";
pub const FORECAST_GBM: &str = "forecast_gbm";

/// Highest accepted pollution level
pub const MAX_POLLUTION: u8 = 5;

/// A store and the week to forecast for it
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastStoreRequest {
    pub store_id: String,
    pub time_step: Duration,
    pub dates: Vec<NaiveDate>,
}

impl ForecastStoreRequest {
    /// Request the seven days starting at `week_start` with a 30 minute step
    pub fn for_week(store_id: impl Into<String>, week_start: NaiveDate) -> Result<Self> {
        let request = Self {
            store_id: store_id.into(),
            time_step: Duration::minutes(30),
            dates: (0..7).map(|d| week_start + Duration::days(d)).collect(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Dates must be seven consecutive days starting on a Monday
    pub fn validate(&self) -> Result<()> {
        if self.store_id.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "store_id must not be empty".to_string(),
            ));
        }
        if self.time_step <= Duration::zero() {
            return Err(ForecastError::InvalidParameter(
                "time_step must be positive".to_string(),
            ));
        }

        let first = match self.dates.first() {
            Some(first) if self.dates.len() == 7 => *first,
            _ => {
                return Err(ForecastError::InvalidParameter(format!(
                    "A request covers 7 dates, got {}",
                    self.dates.len()
                )))
            }
        };
        if first.weekday() != Weekday::Mon {
            return Err(ForecastError::InvalidParameter(format!(
                "Requested week must start on a Monday, {} is a {:?}",
                first,
                first.weekday()
            )));
        }
        let consecutive = self
            .dates
            .windows(2)
            .all(|pair| pair[1] - pair[0] == Duration::days(1));
        if !consecutive {
            return Err(ForecastError::InvalidParameter(
                "Requested dates must be consecutive".to_string(),
            ));
        }
        Ok(())
    }

    /// Short human-readable description
    pub fn label(&self) -> String {
        match (self.dates.first(), self.dates.last()) {
            (Some(first), Some(last)) => format!("store {} {} to {}", self.store_id, first, last),
            _ => format!("store {}", self.store_id),
        }
    }
}

/// Everything a scenario run depends on
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioInputs {
    pub request: ForecastStoreRequest,
    /// Rows at or after the cutoff are hidden from the forecasters
    pub cutoff: NaiveDateTime,
    pub promo: bool,
    pub pollution: u8,
}

impl ScenarioInputs {
    /// Inputs with the cutoff at midnight of the first requested date
    pub fn new(request: ForecastStoreRequest, promo: bool, pollution: u8) -> Result<Self> {
        request.validate()?;
        if pollution > MAX_POLLUTION {
            return Err(ForecastError::InvalidParameter(format!(
                "pollution must be between 0 and {}, got {}",
                MAX_POLLUTION, pollution
            )));
        }
        let cutoff = request
            .dates
            .first()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ForecastError::InvalidParameter("Request has no dates".to_string()))?;

        Ok(Self {
            request,
            cutoff,
            promo,
            pollution,
        })
    }

    pub fn with_cutoff(mut self, cutoff: NaiveDateTime) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Business-feature values held over the forecast week
    pub fn overrides(&self) -> FeatureOverrides {
        let mut overrides = FeatureOverrides::new();
        overrides.insert("promo".to_string(), if self.promo { 1.0 } else { 0.0 });
        overrides.insert("pollution".to_string(), self.pollution as f64);
        overrides
    }
}

/// One forecast slot of one group, next to the recorded actuals
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRow {
    pub start_time: NaiveDateTime,
    pub section: String,
    pub indicator: String,
    pub value: Option<f64>,
    pub forecast_sma: Option<f64>,
    pub forecast_gbm: Option<f64>,
    /// Recorded business-feature values
    pub features: BTreeMap<String, Option<f64>>,
}

/// Forecast quality of one group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMetrics {
    pub section: String,
    pub indicator: String,
    pub mse_sma: Option<f64>,
    pub mse_gbm: Option<f64>,
}

/// Output of a scenario run
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    business_features: Vec<String>,
    rows: Vec<ScenarioRow>,
}

impl ScenarioResult {
    /// Rows ordered by section, indicator, then time
    pub fn rows(&self) -> &[ScenarioRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Long-format frame: `start_time`, `section`, `indicator`, `value`,
    /// `forecast_sma`, `forecast_gbm`, then the business features
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let millis: Vec<i64> = self
            .rows
            .iter()
            .map(|r| r.start_time.and_utc().timestamp_millis())
            .collect();
        let start_time = Series::new(START_TIME, millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

        let mut columns = vec![
            start_time,
            Series::new(
                SECTION,
                self.rows.iter().map(|r| r.section.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                INDICATOR,
                self.rows.iter().map(|r| r.indicator.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(VALUE, self.rows.iter().map(|r| r.value).collect::<Vec<_>>()),
            Series::new(
                FORECAST_SMA,
                self.rows.iter().map(|r| r.forecast_sma).collect::<Vec<_>>(),
            ),
            Series::new(
                FORECAST_GBM,
                self.rows.iter().map(|r| r.forecast_gbm).collect::<Vec<_>>(),
            ),
        ];
        for name in &self.business_features {
            let values: Vec<Option<f64>> = self
                .rows
                .iter()
                .map(|r| r.features.get(name).copied().flatten())
                .collect();
            columns.push(Series::new(name, values));
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Write the frame as CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
        Ok(())
    }

    /// Mean squared error of both forecasts for every group
    pub fn metrics(&self) -> Vec<GroupMetrics> {
        let mut groups: BTreeMap<(&str, &str), Vec<&ScenarioRow>> = BTreeMap::new();
        for row in &self.rows {
            groups
                .entry((row.section.as_str(), row.indicator.as_str()))
                .or_default()
                .push(row);
        }

        groups
            .into_iter()
            .map(|((section, indicator), rows)| {
                let actual: Vec<Option<f64>> = rows.iter().map(|r| r.value).collect();
                let sma: Vec<Option<f64>> = rows.iter().map(|r| r.forecast_sma).collect();
                let gbm: Vec<Option<f64>> = rows.iter().map(|r| r.forecast_gbm).collect();
                GroupMetrics {
                    section: section.to_string(),
                    indicator: indicator.to_string(),
                    mse_sma: mean_squared_error(&sma, &actual),
                    mse_gbm: mean_squared_error(&gbm, &actual),
                }
            })
            .collect()
    }
}

/// Run one scenario over `dataset`
pub fn run_scenario(
    dataset: &StoreDataset,
    inputs: &ScenarioInputs,
    config: &ForecastConfig,
) -> Result<ScenarioResult> {
    inputs.request.validate()?;
    config.validate()?;
    info!(
        scenario = %inputs.request.label(),
        cutoff = %inputs.cutoff,
        promo = inputs.promo,
        pollution = inputs.pollution,
        "running scenario"
    );

    let store = dataset.for_store(&inputs.request.store_id)?;
    if store.is_empty() {
        return Err(ForecastError::DataError(format!(
            "No rows for store '{}'",
            inputs.request.store_id
        )));
    }

    let features = &config.business_features;
    let records = store.records(features)?;
    let visible: Vec<SalesRecord> = records
        .iter()
        .filter(|r| r.start_time < inputs.cutoff)
        .cloned()
        .collect();
    debug!(rows = records.len(), visible = visible.len(), "truncated store data");

    let actuals: HashMap<(&str, &str, NaiveDateTime), &SalesRecord> = records
        .iter()
        .map(|r| ((r.section.as_str(), r.indicator.as_str(), r.start_time), r))
        .collect();

    let overrides: FeatureOverrides = inputs
        .overrides()
        .into_iter()
        .filter(|(name, _)| features.contains(name))
        .collect();
    let sma = WindowedForecaster::seasonal_mean(config.sma_window, config)?;
    let dates = inputs.request.dates.as_slice();

    let mut rows = Vec::new();
    for group in group_tables(&visible, features)? {
        let sma_forecast = sma.forecast(&group.table.value_series(), Some(dates))?;
        let gbm_forecast = forecast_gbm(&group.table, Some(dates), &overrides, config)?;

        let sma_by_time: HashMap<NaiveDateTime, Option<f64>> = sma_forecast.iter().collect();
        let gbm_by_time: HashMap<NaiveDateTime, Option<f64>> = gbm_forecast.iter().collect();
        let slots: BTreeSet<NaiveDateTime> = sma_by_time
            .keys()
            .chain(gbm_by_time.keys())
            .copied()
            .collect();

        info!(
            section = %group.section,
            indicator = %group.indicator,
            history = group.table.len(),
            slots = slots.len(),
            "forecast group"
        );
        let missing = sma_forecast.missing_count() + gbm_forecast.missing_count();
        if missing > 0 {
            warn!(
                section = %group.section,
                indicator = %group.indicator,
                missing,
                "group forecast has missing values"
            );
        }

        for start_time in slots {
            let actual = actuals.get(&(group.section.as_str(), group.indicator.as_str(), start_time));
            rows.push(ScenarioRow {
                start_time,
                section: group.section.clone(),
                indicator: group.indicator.clone(),
                value: actual.and_then(|r| r.value),
                forecast_sma: sma_by_time.get(&start_time).copied().flatten(),
                forecast_gbm: gbm_by_time.get(&start_time).copied().flatten(),
                features: features
                    .iter()
                    .map(|name| {
                        let recorded = actual.and_then(|r| r.features.get(name).copied().flatten());
                        (name.clone(), recorded)
                    })
                    .collect(),
            });
        }
    }

    info!(rows = rows.len(), "scenario complete");
    Ok(ScenarioResult {
        business_features: features.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
    }

    #[test]
    fn test_request_for_week() {
        let request = ForecastStoreRequest::for_week("001", monday()).unwrap();
        assert_eq!(request.dates.len(), 7);
        assert_eq!(request.dates[6], NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(request.label(), "store 001 2024-01-08 to 2024-01-14");
    }

    #[test]
    fn test_request_must_start_monday() {
        let tuesday = monday() + Duration::days(1);
        assert!(matches!(
            ForecastStoreRequest::for_week("001", tuesday),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_request_rejects_gaps() {
        let mut request = ForecastStoreRequest::for_week("001", monday()).unwrap();
        request.dates[3] = request.dates[3] + Duration::days(1);
        assert!(request.validate().is_err());

        request.dates.truncate(5);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_inputs_defaults_and_overrides() {
        let request = ForecastStoreRequest::for_week("001", monday()).unwrap();
        let inputs = ScenarioInputs::new(request.clone(), true, 3).unwrap();
        assert_eq!(inputs.cutoff, monday().and_hms_opt(0, 0, 0).unwrap());

        let overrides = inputs.overrides();
        assert_eq!(overrides.get("promo"), Some(&1.0));
        assert_eq!(overrides.get("pollution"), Some(&3.0));

        assert!(ScenarioInputs::new(request, false, 6).is_err());
    }

    #[test]
    fn test_metrics_per_group() {
        let at = monday().and_hms_opt(12, 0, 0).unwrap();
        let row = |section: &str, value, sma, gbm| ScenarioRow {
            start_time: at,
            section: section.to_string(),
            indicator: "sales".to_string(),
            value,
            forecast_sma: sma,
            forecast_gbm: gbm,
            features: BTreeMap::new(),
        };
        let result = ScenarioResult {
            business_features: Vec::new(),
            rows: vec![
                row("bar", Some(2.0), Some(1.0), None),
                row("kitchen", Some(4.0), Some(4.0), Some(6.0)),
            ],
        };

        let metrics = result.metrics();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].section, "bar");
        assert_eq!(metrics[0].mse_sma, Some(1.0));
        assert_eq!(metrics[0].mse_gbm, None);
        assert_eq!(metrics[1].mse_sma, Some(0.0));
        assert_eq!(metrics[1].mse_gbm, Some(4.0));
    }
}
