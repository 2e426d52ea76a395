//! Reference regressors every learned model should beat

use super::{check_shapes, Regressor};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};

/// Predicts the training-target mean for every row
#[derive(Debug, Clone, Default)]
pub struct MeanRegressor {
    mean: Option<f64>,
}

impl MeanRegressor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Regressor for MeanRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y.len())?;
        self.mean = y.mean();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mean = self
            .mean
            .ok_or_else(|| ForecastError::ModelError("Mean model has not been fitted".to_string()))?;
        Ok(Array1::from_elem(x.nrows(), mean))
    }

    fn name(&self) -> &str {
        "mean"
    }
}

/// Predicts the value of one input column, e.g. today's temperature for tomorrow
#[derive(Debug, Clone)]
pub struct PersistenceRegressor {
    column: String,
    index: Option<usize>,
    fitted: bool,
}

impl PersistenceRegressor {
    /// Persist the feature named `column`
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            index: None,
            fitted: false,
        }
    }
}

impl Regressor for PersistenceRegressor {
    fn bind_features(&mut self, feature_names: &[String]) -> Result<()> {
        let index = feature_names
            .iter()
            .position(|n| *n == self.column)
            .ok_or_else(|| {
                ForecastError::ModelError(format!(
                    "Persistence column '{}' is not a feature",
                    self.column
                ))
            })?;
        self.index = Some(index);
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y.len())?;
        match self.index {
            Some(i) if i < x.ncols() => {
                self.fitted = true;
                Ok(())
            }
            Some(i) => Err(ForecastError::ModelError(format!(
                "Persistence column index {} out of range for {} features",
                i,
                x.ncols()
            ))),
            None => Err(ForecastError::ModelError(format!(
                "Persistence column '{}' was never bound to the feature names",
                self.column
            ))),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self.index {
            Some(i) if self.fitted && i < x.ncols() => Ok(x.column(i).to_owned()),
            _ => Err(ForecastError::ModelError(
                "Persistence model has not been fitted".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "persistence"
    }
}
