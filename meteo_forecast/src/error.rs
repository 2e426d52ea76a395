//! Error types for the meteo_forecast crate

use meteo_features::FeatureError;
use meteo_math::MathError;
use thiserror::Error;

/// Custom error types for the meteo_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// A model could not be fitted or applied
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from feature construction, schema and configuration checks
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Error from the numeric kernels
    #[error("Math error: {0}")]
    MathError(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ForecastError {
    /// Whether this error reports a feature-column mismatch
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, ForecastError::Feature(FeatureError::SchemaMismatch(_)))
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
