//! # Meteo Math
//!
//! Numeric kernels used by the meteocast feature and forecasting crates.
//! This crate performs no I/O and knows nothing about locations or dates
//! beyond plain integer day keys.
//!
//! - [`rolling`]: trailing means with a minimum-periods policy, by row or by day key
//! - [`derived`]: same-day physical quantities (ratios, spreads, wind components, seasonal encodings)
//! - [`metrics`]: forecast error metrics

use thiserror::Error;

pub mod derived;
pub mod metrics;
pub mod rolling;

/// Errors that can occur in numeric calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;

pub use derived::{average, difference, ratio, seasonal_encoding, wind_components};
pub use metrics::{mean_absolute_error, root_mean_squared_error, ErrorSummary};
pub use rolling::{trailing_mean_by_key, trailing_mean_by_row, RollingMean};
