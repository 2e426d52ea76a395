//! Named model matrices cut from a feature table

use crate::error::{ForecastError, Result};
use meteo_features::{check_columns, FeatureTable};
use ndarray::{Array1, Array2, ArrayView1, Axis};

fn check_rows(table: &FeatureTable, rows: &[usize]) -> Result<()> {
    match rows.iter().find(|&&row| row >= table.len()) {
        Some(row) => Err(ForecastError::DataError(format!(
            "Row {} out of range for a table of {} rows",
            row,
            table.len()
        ))),
        None => Ok(()),
    }
}

/// Feature matrix with its column names, one row per sample
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    feature_names: Vec<String>,
    x: Array2<f64>,
}

impl ModelInput {
    /// Wrap a matrix; the column count must match the names
    pub fn new(feature_names: Vec<String>, x: Array2<f64>) -> Result<Self> {
        if x.ncols() != feature_names.len() {
            return Err(ForecastError::DataError(format!(
                "{} feature names for a matrix with {} columns",
                feature_names.len(),
                x.ncols()
            )));
        }
        Ok(Self { feature_names, x })
    }

    /// Feature rows `rows` of `table`
    pub fn from_table(table: &FeatureTable, rows: &[usize]) -> Result<Self> {
        check_rows(table, rows)?;
        let names = table.feature_names().to_vec();
        let mut x = Array2::<f64>::zeros((rows.len(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let column = table.column(name).ok_or_else(|| {
                ForecastError::DataError(format!("Feature column '{}' is missing", name))
            })?;
            for (i, &row) in rows.iter().enumerate() {
                x[[i, j]] = column[row];
            }
        }
        Self::new(names, x)
    }

    /// Column names
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// The matrix
    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    /// Fail unless the columns are exactly `expected`, in order
    pub fn check_schema(&self, expected: &[String]) -> Result<()> {
        check_columns(expected, &self.feature_names)?;
        Ok(())
    }

    /// Subset of rows
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            x: self.x.select(Axis(0), rows),
        }
    }

    /// Append a named column
    pub fn push_column(&mut self, name: String, values: ArrayView1<f64>) -> Result<()> {
        if values.len() != self.nrows() {
            return Err(ForecastError::DataError(format!(
                "Column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.nrows()
            )));
        }
        self.x.push_column(values).map_err(|e| {
            ForecastError::DataError(format!("Cannot append column '{}': {}", name, e))
        })?;
        self.feature_names.push(name);
        Ok(())
    }
}

/// Target matrix with one column per horizon, in increasing horizon order
#[derive(Debug, Clone, PartialEq)]
pub struct TargetMatrix {
    horizons: Vec<u32>,
    y: Array2<f64>,
}

impl TargetMatrix {
    /// Wrap a matrix; horizons must be strictly increasing
    pub fn new(horizons: Vec<u32>, y: Array2<f64>) -> Result<Self> {
        if y.ncols() != horizons.len() {
            return Err(ForecastError::DataError(format!(
                "{} horizons for a matrix with {} columns",
                horizons.len(),
                y.ncols()
            )));
        }
        if horizons.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::InvalidParameter(format!(
                "Horizons must be strictly increasing, got {:?}",
                horizons
            )));
        }
        Ok(Self { horizons, y })
    }

    /// Target rows `rows` of `table`
    pub fn from_table(table: &FeatureTable, rows: &[usize]) -> Result<Self> {
        check_rows(table, rows)?;
        let horizons = table.horizons();
        let mut y = Array2::<f64>::zeros((rows.len(), horizons.len()));
        for (j, name) in table.target_names().iter().enumerate() {
            let column = table.column(name).ok_or_else(|| {
                ForecastError::DataError(format!("Target column '{}' is missing", name))
            })?;
            for (i, &row) in rows.iter().enumerate() {
                y[[i, j]] = column[row];
            }
        }
        Self::new(horizons, y)
    }

    /// Horizons in column order
    pub fn horizons(&self) -> &[u32] {
        &self.horizons
    }

    /// The matrix
    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.y.nrows()
    }

    /// Targets of one horizon column
    pub fn column(&self, j: usize) -> Array1<f64> {
        self.y.column(j).to_owned()
    }

    /// Subset of rows
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            horizons: self.horizons.clone(),
            y: self.y.select(Axis(0), rows),
        }
    }
}
