//! Feature engineering for the regression forecaster

use crate::error::{ForecastError, Result};
use crate::series::SalesTable;
use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

/// Calendar and lag features, in model input order
pub const TIME_FEATURES: [&str; 3] = ["time_block", "is_weekend", "y_lag_1w"];

/// Number of leading rows used to infer the sampling step
const STEP_INFERENCE_ROWS: usize = 5;

/// Derived attributes of one row
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub start_time: NaiveDateTime,
    /// Monday = 0
    pub day_of_week: u32,
    /// Day of month
    pub day: u32,
    /// Time of day in fractional hours, e.g. 13.5 for 13:30
    pub time_block: f64,
    pub is_weekend: bool,
    pub y: Option<f64>,
    /// Value one week earlier
    pub y_lag_1w: Option<f64>,
    /// Business features in declaration order
    pub business: Vec<Option<f64>>,
}

impl FeatureRow {
    /// Model inputs, missing values as NaN
    pub fn model_inputs(&self) -> Vec<f64> {
        let mut inputs = Vec::with_capacity(TIME_FEATURES.len() + self.business.len());
        inputs.push(self.time_block);
        inputs.push(if self.is_weekend { 1.0 } else { 0.0 });
        inputs.push(self.y_lag_1w.unwrap_or(f64::NAN));
        inputs.extend(self.business.iter().map(|v| v.unwrap_or(f64::NAN)));
        inputs
    }
}

/// Sampling step from the first rows; they must be evenly spaced
pub fn infer_step(timestamps: &[NaiveDateTime]) -> Result<Duration> {
    let head = &timestamps[..timestamps.len().min(STEP_INFERENCE_ROWS)];
    let mut diffs = head.windows(2).map(|w| w[1] - w[0]);

    let step = diffs.next().ok_or_else(|| {
        ForecastError::FrequencyInference("at least two timestamps are required".to_string())
    })?;
    if step <= Duration::zero() || diffs.any(|d| d != step) {
        return Err(ForecastError::FrequencyInference(format!(
            "leading timestamps are not evenly spaced: {:?}",
            head
        )));
    }

    Ok(step)
}

/// Rows in one week at `step`
pub fn lag_periods(step: Duration) -> Result<usize> {
    let week = Duration::weeks(1).num_seconds();
    let secs = step.num_seconds();
    if secs <= 0 || week % secs != 0 {
        return Err(ForecastError::FrequencyInference(format!(
            "a step of {} seconds does not divide one week",
            secs
        )));
    }
    Ok((week / secs) as usize)
}

/// Builds [`FeatureRow`]s from a sales table
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEngineer {
    business_features: Vec<String>,
}

impl FeatureEngineer {
    pub fn new(business_features: Vec<String>) -> Self {
        Self { business_features }
    }

    pub fn business_features(&self) -> &[String] {
        &self.business_features
    }

    /// Names of the model inputs, in order
    pub fn feature_names(&self) -> Vec<String> {
        TIME_FEATURES
            .iter()
            .map(|s| s.to_string())
            .chain(self.business_features.iter().cloned())
            .collect()
    }

    /// Derive features for every row of `table`.
    ///
    /// The one-week lag is a fixed row shift, so the table is expected to be
    /// regularly sampled.
    pub fn apply(&self, table: &SalesTable) -> Result<Vec<FeatureRow>> {
        table.require_features(&self.business_features)?;
        if table.is_empty() {
            return Ok(Vec::new());
        }

        let lag = lag_periods(infer_step(table.start_time())?)?;
        let values = table.value();
        let columns: Vec<&[Option<f64>]> = self
            .business_features
            .iter()
            .map(|name| {
                table
                    .feature(name)
                    .ok_or_else(|| ForecastError::MissingColumn(name.clone()))
            })
            .collect::<Result<_>>()?;

        let rows = table
            .start_time()
            .iter()
            .enumerate()
            .map(|(i, ts)| {
                let day_of_week = ts.weekday().num_days_from_monday();
                FeatureRow {
                    start_time: *ts,
                    day_of_week,
                    day: ts.day(),
                    time_block: ts.hour() as f64 + ts.minute() as f64 / 60.0,
                    is_weekend: day_of_week > 4,
                    y: values[i],
                    y_lag_1w: if i >= lag { values[i - lag] } else { None },
                    business: columns.iter().map(|column| column[i]).collect(),
                }
            })
            .collect();

        Ok(rows)
    }
}
