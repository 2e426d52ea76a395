//! Forecast error metrics

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(MathError::LengthMismatch {
            expected: actual.len(),
            actual: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot score an empty series".to_string(),
        ));
    }
    Ok(())
}

/// Mean absolute error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Mean squared error
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Root mean squared error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(actual, predicted)?.sqrt())
}

/// Mean of `predicted - actual`
pub fn mean_bias(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let sum: f64 = actual.iter().zip(predicted).map(|(a, p)| p - a).sum();
    Ok(sum / actual.len() as f64)
}

/// Error metrics for one scored series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean of prediction minus truth
    pub bias: f64,
    /// Number of scored points
    pub n: usize,
}

impl ErrorSummary {
    /// Score a prediction series against the truth
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        Ok(Self {
            rmse: root_mean_squared_error(actual, predicted)?,
            mae: mean_absolute_error(actual, predicted)?,
            bias: mean_bias(actual, predicted)?,
            n: actual.len(),
        })
    }
}

impl std::fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RMSE: {:.4}  MAE: {:.4}  bias: {:+.4}  (n={})",
            self.rmse, self.mae, self.bias, self.n
        )
    }
}
