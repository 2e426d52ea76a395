//! Multi-horizon forecast ensembles
//!
//! Three strategies share one fit/predict contract:
//!
//! - [`EnsembleStrategy::Independent`] fits one regressor per horizon on the
//!   base features. The fits run in parallel.
//! - [`EnsembleStrategy::Joint`] fits one multi-output regressor against
//!   every horizon at once.
//! - [`EnsembleStrategy::Cascaded`] fits horizons in increasing order. Each
//!   step sees the base features plus the in-sample predictions of every
//!   earlier step, appended as `pred_h{h}` columns. Prediction replays the
//!   same chain, so the extra columns are always model output and never a
//!   true target value.
//!
//! The in-sample chain is optimistic: a step trains on its predecessors'
//! best-case fit rather than on out-of-fold predictions.
//!
//! Predicting with columns that differ from the fitted ones, in name or in
//! order, fails with a schema mismatch.

use crate::error::{ForecastError, Result};
use crate::matrix::{ModelInput, TargetMatrix};
use crate::models::{ModelKind, MultiOutputRegressor, PerTargetWrapper, Regressor, RegressorFactory};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// How horizons share models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleStrategy {
    /// One model per horizon
    #[default]
    Independent,
    /// One multi-output model
    Joint,
    /// Per-horizon chain fed by earlier horizons' predictions
    Cascaded,
}

impl fmt::Display for EnsembleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnsembleStrategy::Independent => "independent",
            EnsembleStrategy::Joint => "joint",
            EnsembleStrategy::Cascaded => "cascaded",
        };
        f.write_str(s)
    }
}

/// Name of the chain column carrying horizon `h`'s prediction
pub fn chain_feature_name(horizon: u32) -> String {
    format!("pred_h{}", horizon)
}

/// One column of predictions per horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    /// Horizons in column order
    pub horizons: Vec<u32>,
    /// `rows × horizons`
    pub values: Array2<f64>,
}

impl Predictions {
    /// Predictions of horizon `h`
    pub fn horizon(&self, h: u32) -> Option<ArrayView1<'_, f64>> {
        self.horizons
            .iter()
            .position(|&x| x == h)
            .map(|j| self.values.column(j))
    }

    /// Number of predicted rows
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }
}

enum Fitted {
    PerHorizon(Vec<Box<dyn Regressor>>),
    Joint,
    Cascade(Vec<Box<dyn Regressor>>),
}

/// Forecast ensemble over a fixed horizon set
pub struct ForecastEnsemble {
    strategy: EnsembleStrategy,
    factory: RegressorFactory,
    joint: Box<dyn MultiOutputRegressor>,
    expected_features: Option<Vec<String>>,
    feature_names: Vec<String>,
    horizons: Vec<u32>,
    fitted: Option<Fitted>,
}

impl fmt::Debug for ForecastEnsemble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastEnsemble")
            .field("strategy", &self.strategy)
            .field("feature_names", &self.feature_names)
            .field("horizons", &self.horizons)
            .field("fitted", &self.fitted.is_some())
            .finish()
    }
}

impl ForecastEnsemble {
    /// Ensemble whose joint strategy wraps `factory` per target
    pub fn new(strategy: EnsembleStrategy, factory: RegressorFactory) -> Self {
        let joint = Box::new(PerTargetWrapper::new(factory.clone()));
        Self::with_parts(strategy, factory, joint)
    }

    /// Ensemble of a configured model kind; ridge solves the joint strategy natively
    pub fn from_kind(strategy: EnsembleStrategy, kind: &ModelKind) -> Result<Self> {
        kind.validate()?;
        Ok(Self::with_parts(strategy, kind.factory(), kind.multi_output()))
    }

    fn with_parts(
        strategy: EnsembleStrategy,
        factory: RegressorFactory,
        joint: Box<dyn MultiOutputRegressor>,
    ) -> Self {
        Self {
            strategy,
            factory,
            joint,
            expected_features: None,
            feature_names: Vec::new(),
            horizons: Vec::new(),
            fitted: None,
        }
    }

    /// Require the training columns to be exactly `names`
    pub fn with_expected_features(mut self, names: Vec<String>) -> Self {
        self.expected_features = Some(names);
        self
    }

    pub fn strategy(&self) -> EnsembleStrategy {
        self.strategy
    }

    /// Columns recorded at fit time
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Horizons recorded at fit time
    pub fn horizons(&self) -> &[u32] {
        &self.horizons
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fit every horizon; refitting discards the previous models
    pub fn fit(&mut self, input: &ModelInput, targets: &TargetMatrix) -> Result<()> {
        if let Some(expected) = &self.expected_features {
            input.check_schema(expected)?;
        }
        if input.nrows() != targets.nrows() {
            return Err(ForecastError::DataError(format!(
                "{} feature rows for {} target rows",
                input.nrows(),
                targets.nrows()
            )));
        }
        if targets.horizons().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one horizon is required".to_string(),
            ));
        }
        self.fitted = None;

        let fitted = match self.strategy {
            EnsembleStrategy::Independent => Fitted::PerHorizon(self.fit_independent(input, targets)?),
            EnsembleStrategy::Joint => {
                self.joint.bind_features(input.feature_names())?;
                self.joint.fit(input.x(), targets.y())?;
                Fitted::Joint
            }
            EnsembleStrategy::Cascaded => Fitted::Cascade(self.fit_cascade(input, targets)?),
        };

        self.feature_names = input.feature_names().to_vec();
        self.horizons = targets.horizons().to_vec();
        self.fitted = Some(fitted);
        info!(
            "Fitted {} ensemble on {} rows x {} features for horizons {:?}",
            self.strategy,
            input.nrows(),
            self.feature_names.len(),
            self.horizons
        );
        Ok(())
    }

    fn fit_independent(
        &self,
        input: &ModelInput,
        targets: &TargetMatrix,
    ) -> Result<Vec<Box<dyn Regressor>>> {
        let factory = &self.factory;
        (0..targets.horizons().len())
            .into_par_iter()
            .map(|j| {
                let mut model = factory();
                model.bind_features(input.feature_names())?;
                model.fit(input.x(), &targets.column(j))?;
                Ok(model)
            })
            .collect()
    }

    fn fit_cascade(
        &self,
        input: &ModelInput,
        targets: &TargetMatrix,
    ) -> Result<Vec<Box<dyn Regressor>>> {
        let horizons = targets.horizons();
        for &h in &horizons[..horizons.len() - 1] {
            let name = chain_feature_name(h);
            if input.feature_names().contains(&name) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Feature '{}' collides with a cascade column",
                    name
                )));
            }
        }

        let mut chain = input.clone();
        let mut models = Vec::with_capacity(horizons.len());
        for (j, &h) in horizons.iter().enumerate() {
            let mut model = (self.factory)();
            model.bind_features(chain.feature_names())?;
            model.fit(chain.x(), &targets.column(j))?;
            debug!(
                "Cascade step h={} fitted on {} columns",
                h,
                chain.feature_names().len()
            );
            if j + 1 < horizons.len() {
                let in_sample = model.predict(chain.x())?;
                chain.push_column(chain_feature_name(h), in_sample.view())?;
            }
            models.push(model);
        }
        Ok(models)
    }

    /// Predict every horizon for the rows of `input`
    pub fn predict(&self, input: &ModelInput) -> Result<Predictions> {
        let fitted = self.fitted.as_ref().ok_or_else(|| {
            ForecastError::ModelError("Ensemble has not been fitted".to_string())
        })?;
        input.check_schema(&self.feature_names)?;

        let mut values = Array2::<f64>::zeros((input.nrows(), self.horizons.len()));
        match fitted {
            Fitted::PerHorizon(models) => {
                let columns = models
                    .par_iter()
                    .map(|model| model.predict(input.x()))
                    .collect::<Result<Vec<_>>>()?;
                for (j, column) in columns.iter().enumerate() {
                    values.column_mut(j).assign(column);
                }
            }
            Fitted::Joint => {
                values = self.joint.predict(input.x())?;
            }
            Fitted::Cascade(models) => {
                let mut chain = input.clone();
                for (j, (model, &h)) in models.iter().zip(&self.horizons).enumerate() {
                    let column = model.predict(chain.x())?;
                    values.column_mut(j).assign(&column);
                    if j + 1 < models.len() {
                        chain.push_column(chain_feature_name(h), column.view())?;
                    }
                }
            }
        }

        if values.ncols() != self.horizons.len() || values.nrows() != input.nrows() {
            return Err(ForecastError::ModelError(format!(
                "Model returned {}x{} predictions, expected {}x{}",
                values.nrows(),
                values.ncols(),
                input.nrows(),
                self.horizons.len()
            )));
        }
        Ok(Predictions {
            horizons: self.horizons.clone(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn data() -> (ModelInput, TargetMatrix) {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        // h1 = 2x, h2 = 3x + 1
        let y = array![
            [2.0, 4.0],
            [4.0, 7.0],
            [6.0, 10.0],
            [8.0, 13.0],
            [10.0, 16.0],
            [12.0, 19.0]
        ];
        (
            ModelInput::new(vec!["x".to_string()], x).unwrap(),
            TargetMatrix::new(vec![1, 2], y).unwrap(),
        )
    }

    #[test]
    fn test_strategies_agree_on_exact_linear_targets() {
        let (input, targets) = data();
        // a small alpha keeps the collinear cascade columns solvable
        let kind = ModelKind::Ridge { alpha: 1e-6 };
        for strategy in [
            EnsembleStrategy::Independent,
            EnsembleStrategy::Joint,
            EnsembleStrategy::Cascaded,
        ] {
            let mut ensemble = ForecastEnsemble::from_kind(strategy, &kind).unwrap();
            ensemble.fit(&input, &targets).unwrap();
            let pred = ensemble.predict(&input).unwrap();
            assert_eq!(pred.horizons, vec![1, 2]);
            for (p, t) in pred.values.iter().zip(targets.y().iter()) {
                assert_abs_diff_eq!(*p, *t, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_predict_requires_fit() {
        let (input, _) = data();
        let ensemble = ForecastEnsemble::new(EnsembleStrategy::Joint, ModelKind::Mean.factory());
        assert!(ensemble.predict(&input).is_err());
    }

    #[test]
    fn test_cascade_name_collision() {
        let x = array![[1.0], [2.0], [3.0]];
        let input = ModelInput::new(vec!["pred_h1".to_string()], x).unwrap();
        let targets = TargetMatrix::new(vec![1, 2], array![[1.0, 2.0], [2.0, 3.0], [3.0, 4.0]]).unwrap();
        let mut ensemble =
            ForecastEnsemble::new(EnsembleStrategy::Cascaded, ModelKind::Mean.factory());
        assert!(ensemble.fit(&input, &targets).is_err());
    }

    #[test]
    fn test_strategy_json() {
        let s: EnsembleStrategy = serde_json::from_str("\"cascaded\"").unwrap();
        assert_eq!(s, EnsembleStrategy::Cascaded);
        assert_eq!(s.to_string(), "cascaded");
    }
}
