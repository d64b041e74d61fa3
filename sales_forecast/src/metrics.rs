//! Forecast evaluation metrics

use crate::error::{ForecastError, Result};
use statrs::statistics::Statistics;
use std::fmt;

/// Accuracy of a forecast against actual values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Number of (forecast, actual) pairs scored
    pub count: usize,
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics ({} points):", self.count)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        Ok(())
    }
}

/// Score `forecast` against `actual` over the positions where both are
/// present
pub fn forecast_accuracy(forecast: &[Option<f64>], actual: &[Option<f64>]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() {
        return Err(ForecastError::DataError(format!(
            "Forecast ({}) and actual ({}) lengths differ",
            forecast.len(),
            actual.len()
        )));
    }

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual)
        .filter_map(|(f, a)| match (f, a) {
            (Some(f), Some(a)) => Some(a - f),
            _ => None,
        })
        .collect();

    if errors.is_empty() {
        return Err(ForecastError::DataError(
            "No position has both a forecast and an actual value".to_string(),
        ));
    }

    let mae = errors.iter().map(|e| e.abs()).mean();
    let mse = errors.iter().map(|e| e * e).mean();

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse: mse.sqrt(),
        count: errors.len(),
    })
}

/// Mean squared error, or `None` when no pair is scorable
pub fn mean_squared_error(forecast: &[Option<f64>], actual: &[Option<f64>]) -> Option<f64> {
    forecast_accuracy(forecast, actual).ok().map(|acc| acc.mse)
}
