//! Gradient-boosted regression trees

use crate::error::{ForecastError, Result};
use crate::models::tree::{RegressionTree, TreeBuilder, TreeParams};
use crate::models::{Regressor, TrainedRegressor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hyper-parameters of the boosted ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Number of boosting rounds
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 penalty on leaf weights
    pub lambda: f64,
    /// Minimum number of rows per child
    pub min_child_weight: f64,
    /// Fraction of rows sampled for each tree
    pub subsample: f64,
    /// Seed of the row sampler
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            lambda: 1.0,
            min_child_weight: 1.0,
            subsample: 0.8,
            seed: 42,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.max_depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_depth must be positive".to_string(),
            ));
        }
        if self.lambda < 0.0 || self.min_child_weight < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "lambda and min_child_weight must not be negative".to_string(),
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

/// Gradient-boosted tree regressor with squared-error loss
#[derive(Debug, Clone)]
pub struct GradientBoostedRegressor {
    name: String,
    params: BoostingParams,
}

/// Fitted ensemble. Immutable; share it behind an `Arc` for concurrent
/// prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedBoostedModel {
    name: String,
    base_score: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GradientBoostedRegressor {
    pub fn new(params: BoostingParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            name: format!(
                "Gradient Boosted Trees (n={}, depth={}, eta={})",
                params.n_estimators, params.max_depth, params.learning_rate
            ),
            params,
        })
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }
}

impl Regressor for GradientBoostedRegressor {
    type Trained = TrainedBoostedModel;

    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained> {
        if features.is_empty() {
            return Err(ForecastError::ModelError(
                "Cannot fit on an empty feature matrix".to_string(),
            ));
        }
        if features.len() != targets.len() {
            return Err(ForecastError::ModelError(format!(
                "Feature rows ({}) doesn't match targets ({})",
                features.len(),
                targets.len()
            )));
        }
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(ForecastError::ModelError(
                "Targets must be finite".to_string(),
            ));
        }

        let n_features = features[0].len();
        if let Some(row) = features.iter().find(|row| row.len() != n_features) {
            return Err(ForecastError::ModelError(format!(
                "Ragged feature matrix: expected {} columns, found {}",
                n_features,
                row.len()
            )));
        }

        let n = targets.len();
        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            lambda: self.params.lambda,
            min_child_weight: self.params.min_child_weight,
            learning_rate: self.params.learning_rate,
        };

        let base_score = targets.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![base_score; n];
        let mut gradients = vec![0.0; n];
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for _ in 0..self.params.n_estimators {
            for i in 0..n {
                gradients[i] = predictions[i] - targets[i];
            }

            let mut rows: Vec<usize> = if self.params.subsample < 1.0 {
                (0..n)
                    .filter(|_| rng.gen::<f64>() < self.params.subsample)
                    .collect()
            } else {
                (0..n).collect()
            };
            if rows.is_empty() {
                rows = (0..n).collect();
            }

            let tree = TreeBuilder::new(&columns, &gradients, tree_params).build(rows);
            for i in 0..n {
                predictions[i] += tree.predict_by(|f| columns[f][i]);
            }
            trees.push(tree);
        }

        let mse = predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / n as f64;
        debug!(
            rows = n,
            features = n_features,
            trees = trees.len(),
            base_score,
            train_rmse = mse.sqrt(),
            "fitted boosted ensemble"
        );

        Ok(TrainedBoostedModel {
            name: self.name.clone(),
            base_score,
            trees,
            n_features,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedBoostedModel {
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Indices of the features any tree splits on
    pub fn used_features(&self) -> Vec<usize> {
        let mut used: Vec<usize> = self
            .trees
            .iter()
            .flat_map(|tree| tree.split_features())
            .collect();
        used.sort_unstable();
        used.dedup();
        used
    }
}

impl TrainedRegressor for TrainedBoostedModel {
    fn predict_row(&self, features: &[f64]) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.predict(features))
                .sum::<f64>()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn name(&self) -> &str {
        &self.name
    }
}
