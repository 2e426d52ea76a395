//! Regressors behind a fit/predict contract
//!
//! The ensembles never look inside a model. Anything implementing
//! [`Regressor`] can forecast a horizon, and anything implementing
//! [`MultiOutputRegressor`] can forecast all of them at once.

pub mod baseline;
pub mod ridge;

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::Arc;

pub use baseline::{MeanRegressor, PersistenceRegressor};
pub use ridge::RidgeRegression;

/// Single-output regressor
pub trait Regressor: Send + Sync + Debug {
    /// Called with the training column names before [`Regressor::fit`]
    fn bind_features(&mut self, _feature_names: &[String]) -> Result<()> {
        Ok(())
    }

    /// Fit on rows of `x` against `y`
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Model name
    fn name(&self) -> &str;
}

/// Regressor predicting every target column at once
pub trait MultiOutputRegressor: Send + Sync + Debug {
    /// Called with the training column names before [`MultiOutputRegressor::fit`]
    fn bind_features(&mut self, _feature_names: &[String]) -> Result<()> {
        Ok(())
    }

    /// Fit on rows of `x` against every column of `y`
    fn fit(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<()>;

    /// Predict one row of outputs per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Model name
    fn name(&self) -> &str;
}

/// Builds fresh, unfitted regressors
pub type RegressorFactory = Arc<dyn Fn() -> Box<dyn Regressor> + Send + Sync>;

/// Validate rows and shapes shared by every model
pub(crate) fn check_shapes(x: &Array2<f64>, n_targets: usize) -> Result<()> {
    if x.nrows() == 0 {
        return Err(ForecastError::ModelError(
            "Cannot fit on an empty matrix".to_string(),
        ));
    }
    if x.nrows() != n_targets {
        return Err(ForecastError::ModelError(format!(
            "{} feature rows for {} targets",
            x.nrows(),
            n_targets
        )));
    }
    Ok(())
}

/// Fits one single-output regressor per target column, in parallel
pub struct PerTargetWrapper {
    factory: RegressorFactory,
    feature_names: Vec<String>,
    models: Vec<Box<dyn Regressor>>,
}

impl Debug for PerTargetWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerTargetWrapper")
            .field("models", &self.models)
            .finish()
    }
}

impl PerTargetWrapper {
    /// Wrap a regressor factory
    pub fn new(factory: RegressorFactory) -> Self {
        Self {
            factory,
            feature_names: Vec::new(),
            models: Vec::new(),
        }
    }

    /// Fitted per-target models
    pub fn models(&self) -> &[Box<dyn Regressor>] {
        &self.models
    }
}

impl MultiOutputRegressor for PerTargetWrapper {
    fn bind_features(&mut self, feature_names: &[String]) -> Result<()> {
        self.feature_names = feature_names.to_vec();
        Ok(())
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<()> {
        check_shapes(x, y.nrows())?;
        let factory = &self.factory;
        let names = &self.feature_names;
        self.models = (0..y.ncols())
            .into_par_iter()
            .map(|j| {
                let mut model = factory();
                model.bind_features(names)?;
                model.fit(x, &y.column(j).to_owned())?;
                Ok(model)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.models.is_empty() {
            return Err(ForecastError::ModelError(
                "Multi-output wrapper has not been fitted".to_string(),
            ));
        }
        let mut out = Array2::<f64>::zeros((x.nrows(), self.models.len()));
        for (j, model) in self.models.iter().enumerate() {
            out.column_mut(j).assign(&model.predict(x)?);
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "per_target"
    }
}

/// Serializable choice of regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    /// L2-regularized least squares
    Ridge { alpha: f64 },
    /// Training-target mean
    Mean,
    /// Echo an input column
    Persistence { column: String },
}

impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::Ridge { alpha: 1.0 }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Ridge { alpha } => write!(f, "ridge(alpha={})", alpha),
            ModelKind::Mean => f.write_str("mean"),
            ModelKind::Persistence { column } => write!(f, "persistence({})", column),
        }
    }
}

impl ModelKind {
    /// Reject parameters no model can be built from
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelKind::Ridge { alpha } if !(alpha.is_finite() && *alpha >= 0.0) => Err(
                ForecastError::InvalidParameter(format!("ridge alpha must be >= 0, got {}", alpha)),
            ),
            ModelKind::Persistence { column } if column.is_empty() => Err(
                ForecastError::InvalidParameter("persistence column must be named".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Factory of single-output regressors
    pub fn factory(&self) -> RegressorFactory {
        match self.clone() {
            ModelKind::Ridge { alpha } => {
                Arc::new(move || Box::new(RidgeRegression::new(alpha)) as Box<dyn Regressor>)
            }
            ModelKind::Mean => Arc::new(|| Box::new(MeanRegressor::new()) as Box<dyn Regressor>),
            ModelKind::Persistence { column } => {
                Arc::new(move || {
                    Box::new(PersistenceRegressor::new(column.clone())) as Box<dyn Regressor>
                })
            }
        }
    }

    /// Joint model over all targets; ridge solves every output natively
    pub fn multi_output(&self) -> Box<dyn MultiOutputRegressor> {
        match self {
            ModelKind::Ridge { alpha } => Box::new(RidgeRegression::new(*alpha)),
            _ => Box::new(PerTargetWrapper::new(self.factory())),
        }
    }
}
