//! Forecast configuration

use crate::error::{ForecastError, Result};
use crate::models::boosting::BoostingParams;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Business features the store dataset carries
pub const DEFAULT_BUSINESS_FEATURES: [&str; 2] = ["promo", "pollution"];

/// Settings shared by every forecaster.
///
/// All fields have defaults, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Look-back window of the seasonal moving average, in weeks
    pub sma_window: usize,
    /// Step used when a series is too short to infer its own
    pub time_step_minutes: i64,
    /// Days forecast when no target dates are given
    pub default_horizon_days: u32,
    /// Upper bound on one-week expansions per forecast call
    pub max_horizon_weeks: usize,
    /// Scalar columns fed to the regression forecaster
    pub business_features: Vec<String>,
    pub boosting: BoostingParams,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            sma_window: 4,
            time_step_minutes: 30,
            default_horizon_days: 7,
            max_horizon_weeks: 52,
            business_features: DEFAULT_BUSINESS_FEATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            boosting: BoostingParams::default(),
        }
    }
}

impl ForecastConfig {
    /// Load and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting is usable
    pub fn validate(&self) -> Result<()> {
        if self.sma_window == 0 {
            return Err(ForecastError::InvalidParameter(
                "sma_window must be positive".to_string(),
            ));
        }

        if self.time_step_minutes <= 0 || (7 * 24 * 60) % self.time_step_minutes != 0 {
            return Err(ForecastError::InvalidParameter(format!(
                "time_step_minutes must be a positive divisor of one week, got {}",
                self.time_step_minutes
            )));
        }

        if self.default_horizon_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "default_horizon_days must be positive".to_string(),
            ));
        }

        if self.max_horizon_weeks == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_horizon_weeks must be positive".to_string(),
            ));
        }

        let mut names = self.business_features.clone();
        names.sort();
        names.dedup();
        if names.len() != self.business_features.len() {
            return Err(ForecastError::InvalidParameter(
                "business_features contains duplicates".to_string(),
            ));
        }

        self.boosting.validate()
    }

    /// Fallback sampling step
    pub fn time_step(&self) -> Duration {
        Duration::minutes(self.time_step_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ForecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.time_step(), Duration::minutes(30));
        assert_eq!(config.business_features, vec!["promo", "pollution"]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ForecastConfig = serde_json::from_str(r#"{"sma_window": 2}"#).unwrap();
        assert_eq!(config.sma_window, 2);
        assert_eq!(config.max_horizon_weeks, 52);
        assert_eq!(config.boosting, BoostingParams::default());
    }

    #[test]
    fn test_invalid_settings() {
        let config = ForecastConfig {
            sma_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ForecastConfig {
            time_step_minutes: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ForecastConfig {
            business_features: vec!["promo".to_string(), "promo".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
