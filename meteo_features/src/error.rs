//! Error types for the meteo_features crate
//!
//! Only fatal conditions are errors. Rows that cannot be used because of a
//! sentinel, a shift past the end of a series or a join miss are counted in
//! a [`crate::frame::DropReport`] instead.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the meteo_features crate
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Configuration rejected before any data is touched
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Column set differs from the declared or recorded schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error from the numeric kernels
    #[error("Math error: {0}")]
    MathError(#[from] meteo_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, FeatureError>;

impl From<PolarsError> for FeatureError {
    fn from(err: PolarsError) -> Self {
        FeatureError::PolarsError(err.to_string())
    }
}
