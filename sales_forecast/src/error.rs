//! Error types for the sales_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the sales_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// A required column is absent from the input table
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The sampling step of a series could not be determined
    #[error("Could not infer time step: {0}")]
    FrequencyInference(String),

    /// Requested dates lie too far beyond the observed data
    #[error("Forecast horizon of {requested} weeks exceeds the limit of {limit} weeks")]
    HorizonTooLong { requested: usize, limit: usize },

    /// Error raised while fitting or evaluating a regression model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error from the slot window calculations
    #[error("Math error: {0}")]
    MathError(#[from] slot_math::MathError),

    /// Error from configuration loading
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from parsing dates and timestamps
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}

impl From<chrono::ParseError> for ForecastError {
    fn from(err: chrono::ParseError) -> Self {
        ForecastError::ParseError(err.to_string())
    }
}
