//! Recursive gradient-boosted forecasting
//!
//! The model is fitted once on the full history. Forecasting then walks
//! forward one week at a time: each new week gets its lag feature from the
//! week before, which from the second week on is itself a forecast.

use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::expanding::{Coverage, ExpandingDriver};
use crate::features::FeatureEngineer;
use crate::models::boosting::{GradientBoostedRegressor, TrainedBoostedModel};
use crate::models::{Regressor, TrainedRegressor};
use crate::series::{SalesTable, TimeSeries};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Scalar business-feature values applied to the whole forecast horizon
pub type FeatureOverrides = BTreeMap<String, f64>;

/// Unfitted recursive forecaster
#[derive(Debug, Clone)]
pub struct BoostedForecaster {
    engineer: FeatureEngineer,
    regressor: GradientBoostedRegressor,
    driver: ExpandingDriver,
}

/// Forecaster holding a fitted model and the history it was fitted on
#[derive(Debug, Clone)]
pub struct FittedBoostedForecaster {
    engineer: FeatureEngineer,
    model: Arc<TrainedBoostedModel>,
    driver: ExpandingDriver,
    history: SalesTable,
}

impl BoostedForecaster {
    pub fn new(config: &ForecastConfig) -> Result<Self> {
        Ok(Self {
            engineer: FeatureEngineer::new(config.business_features.clone()),
            regressor: GradientBoostedRegressor::new(config.boosting.clone())?,
            driver: ExpandingDriver::new(config).with_coverage(Coverage::FullDay),
        })
    }

    /// Fit the regressor on every row of `history` that has a value
    pub fn fit(&self, history: &SalesTable) -> Result<FittedBoostedForecaster> {
        if history.is_empty() {
            return Err(ForecastError::DataError(
                "Cannot fit on an empty table".to_string(),
            ));
        }

        let rows = self.engineer.apply(history)?;
        let (features, targets): (Vec<Vec<f64>>, Vec<f64>) = rows
            .iter()
            .filter_map(|row| row.y.map(|y| (row.model_inputs(), y)))
            .unzip();
        debug!(
            rows = rows.len(),
            training_rows = targets.len(),
            features = ?self.engineer.feature_names(),
            "fitting recursive forecaster"
        );

        let model = self.regressor.fit(&features, &targets)?;

        Ok(FittedBoostedForecaster {
            engineer: self.engineer.clone(),
            model: Arc::new(model),
            driver: self.driver.clone(),
            history: history.clone(),
        })
    }
}

impl FittedBoostedForecaster {
    /// The fitted model, shared by every forecast call
    pub fn model(&self) -> &TrainedBoostedModel {
        &self.model
    }

    /// A handle on the fitted model for use on other threads
    pub fn shared_model(&self) -> Arc<TrainedBoostedModel> {
        Arc::clone(&self.model)
    }

    /// Forecast `dates` (default: the week after the history).
    ///
    /// Declared business features missing from `overrides` are unknown over
    /// the horizon and reach the model as missing values.
    pub fn forecast(
        &self,
        dates: Option<&[NaiveDate]>,
        overrides: &FeatureOverrides,
    ) -> Result<TimeSeries> {
        let declared = self.engineer.business_features();
        for name in overrides.keys() {
            if !declared.contains(name) {
                warn!(feature = %name, "override ignored: not a declared business feature");
            }
        }
        let horizon_features: BTreeMap<String, Option<f64>> = declared
            .iter()
            .map(|name| (name.clone(), overrides.get(name).copied()))
            .collect();

        let mut working = self.history.clone();
        self.driver
            .run(&self.history.value_series(), dates, |_, placeholder| {
                let future = SalesTable::placeholder(placeholder.to_vec(), &horizon_features)?;
                let rows = self.engineer.apply(&working.concat(&future)?)?;

                let predictions: Vec<Option<f64>> = rows[rows.len() - placeholder.len()..]
                    .iter()
                    .map(|row| Some(self.model.predict_row(&row.model_inputs())))
                    .collect();

                working.append(&future.with_values(predictions.clone())?)?;
                Ok(predictions)
            })
    }
}

/// Fit on `history` and forecast `dates` in one call.
///
/// An empty history yields an empty forecast.
pub fn forecast_gbm(
    history: &SalesTable,
    dates: Option<&[NaiveDate]>,
    overrides: &FeatureOverrides,
    config: &ForecastConfig,
) -> Result<TimeSeries> {
    if history.is_empty() {
        return Ok(TimeSeries::empty());
    }

    BoostedForecaster::new(config)?
        .fit(history)?
        .forecast(dates, overrides)
}
