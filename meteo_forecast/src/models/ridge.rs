//! Closed-form ridge regression
//!
//! Features and targets are centred, so the intercept is never penalized.
//! The normal equations are solved by Cholesky factorization, falling back
//! to Gauss-Jordan elimination when the system is not positive definite.

use super::{check_shapes, MultiOutputRegressor, Regressor};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Lower-triangular `L` with `a = L Lᵀ`, or `None` if `a` is not positive definite
fn cholesky(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve `L Lᵀ x = b`
fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

/// Solve `a X = b` for every column of `b` by Gauss-Jordan elimination with partial pivoting
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let m = b.ncols();
    let mut aug = Array2::<f64>::zeros((n, n + m));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        for j in 0..m {
            aug[[i, n + j]] = b[[i, j]];
        }
    }

    for col in 0..n {
        let mut pivot_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[pivot_row, col]].abs() {
                pivot_row = row;
            }
        }
        if aug[[pivot_row, col]].abs() < 1e-12 {
            return None;
        }
        if pivot_row != col {
            for j in 0..n + m {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..n + m {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                if factor != 0.0 {
                    for j in 0..n + m {
                        aug[[row, j]] -= factor * aug[[col, j]];
                    }
                }
            }
        }
    }

    Some(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Ridge regression with one coefficient column per output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    /// L2 regularization strength
    pub alpha: f64,
    coefficients: Option<Array2<f64>>,
    intercepts: Option<Array1<f64>>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    /// Unfitted model
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coefficients: None,
            intercepts: None,
        }
    }

    /// Fitted coefficients, `features × outputs`
    pub fn coefficients(&self) -> Option<&Array2<f64>> {
        self.coefficients.as_ref()
    }

    /// Fitted intercepts, one per output
    pub fn intercepts(&self) -> Option<&Array1<f64>> {
        self.intercepts.as_ref()
    }

    fn fit_outputs(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<()> {
        check_shapes(x, y.nrows())?;
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "alpha must be >= 0, got {}",
                self.alpha
            )));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ForecastError::ModelError("Empty feature matrix".to_string()))?;
        let y_mean = y
            .mean_axis(Axis(0))
            .ok_or_else(|| ForecastError::ModelError("Empty target matrix".to_string()))?;
        let x_c = x - &x_mean.view().insert_axis(Axis(0));
        let y_c = y - &y_mean.view().insert_axis(Axis(0));

        let mut xtx = x_c.t().dot(&x_c);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += self.alpha;
        }
        let xty = x_c.t().dot(&y_c);

        let coefficients = match cholesky(&xtx) {
            Some(l) => {
                let mut w = Array2::<f64>::zeros(xty.raw_dim());
                for j in 0..xty.ncols() {
                    w.column_mut(j)
                        .assign(&cholesky_solve(&l, &xty.column(j).to_owned()));
                }
                w
            }
            None => gauss_jordan_solve(&xtx, &xty).ok_or_else(|| {
                ForecastError::ModelError(
                    "Singular normal equations; increase alpha or drop constant features"
                        .to_string(),
                )
            })?,
        };

        let intercepts = &y_mean - &x_mean.dot(&coefficients);
        self.coefficients = Some(coefficients);
        self.intercepts = Some(intercepts);
        Ok(())
    }

    fn predict_outputs(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (coefficients, intercepts) = match (&self.coefficients, &self.intercepts) {
            (Some(w), Some(b)) => (w, b),
            _ => {
                return Err(ForecastError::ModelError(
                    "Ridge regression has not been fitted".to_string(),
                ))
            }
        };
        if x.ncols() != coefficients.nrows() {
            return Err(ForecastError::ModelError(format!(
                "Fitted on {} features, got {}",
                coefficients.nrows(),
                x.ncols()
            )));
        }
        Ok(x.dot(coefficients) + &intercepts.view().insert_axis(Axis(0)))
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let y = y.view().insert_axis(Axis(1)).to_owned();
        self.fit_outputs(x, &y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let out = self.predict_outputs(x)?;
        if out.ncols() != 1 {
            return Err(ForecastError::ModelError(format!(
                "Ridge model has {} outputs; use the multi-output interface",
                out.ncols()
            )));
        }
        Ok(out.column(0).to_owned())
    }

    fn name(&self) -> &str {
        "ridge"
    }
}

impl MultiOutputRegressor for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<()> {
        self.fit_outputs(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.predict_outputs(x)
    }

    fn name(&self) -> &str {
        "ridge"
    }
}
