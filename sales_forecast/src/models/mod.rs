//! Regression models used by the recursive forecaster

use crate::error::Result;
use std::fmt::Debug;

/// Fitted regression model. Prediction only reads the model, so a fitted
/// model can be shared between threads.
pub trait TrainedRegressor: Debug + Send + Sync {
    /// Predict one row of features
    fn predict_row(&self, features: &[f64]) -> f64;

    /// Predict many rows
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Number of input features the model was fitted with
    fn n_features(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Regression model that can be fitted on a feature matrix
pub trait Regressor: Debug + Clone {
    /// The type of fitted model produced
    type Trained: TrainedRegressor;

    /// Fit on row-major `features` against `targets`. Missing features are NaN.
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod boosting;
pub mod tree;
