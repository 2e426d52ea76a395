//! Per-horizon scoring on the test partition

use crate::ensemble::Predictions;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use meteo_features::{target_column_name, FeatureTable, SplitAssignment};
use meteo_math::ErrorSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// One test row's truth and prediction for a horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPoint {
    /// Date of the row the forecast was issued from
    pub date: NaiveDate,
    pub location: String,
    pub truth: f64,
    pub prediction: f64,
}

/// Scores of one horizon with the series they were computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonMetrics {
    pub horizon: u32,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean of prediction minus truth
    pub bias: f64,
    /// Number of scored rows
    pub n: usize,
    /// Aligned series in table order
    pub aligned: Vec<AlignedPoint>,
}

impl fmt::Display for HorizonMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h={}: RMSE {:.4}, MAE {:.4}, bias {:+.4} (n={})",
            self.horizon, self.rmse, self.mae, self.bias, self.n
        )
    }
}

/// Test-partition scores for every horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Per-horizon metrics in increasing horizon order
    pub horizons: Vec<HorizonMetrics>,
}

impl EvaluationReport {
    /// Metrics of horizon `h`
    pub fn horizon(&self, h: u32) -> Option<&HorizonMetrics> {
        self.horizons.iter().find(|m| m.horizon == h)
    }

    /// Write the report as pretty JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, m) in self.horizons.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", m)?;
        }
        Ok(())
    }
}

/// Scores predictions against a table's targets
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Score `predictions`, issued for `rows` of `table`
    ///
    /// Every row must belong to the test partition.
    pub fn evaluate(
        table: &FeatureTable,
        rows: &[usize],
        predictions: &Predictions,
    ) -> Result<EvaluationReport> {
        if predictions.nrows() != rows.len() {
            return Err(ForecastError::DataError(format!(
                "{} predictions for {} rows",
                predictions.nrows(),
                rows.len()
            )));
        }
        if let Some(&row) = rows
            .iter()
            .find(|&&r| table.splits().get(r) != Some(&SplitAssignment::Test))
        {
            return Err(ForecastError::DataError(format!(
                "Row {} is not in the test partition",
                row
            )));
        }

        let mut horizons = Vec::with_capacity(predictions.horizons.len());
        for (j, &h) in predictions.horizons.iter().enumerate() {
            let name = target_column_name(h);
            let truth_column = table.column(&name).ok_or_else(|| {
                ForecastError::DataError(format!("Target column '{}' is missing", name))
            })?;

            let predicted = predictions.values.column(j);
            let aligned: Vec<AlignedPoint> = rows
                .iter()
                .enumerate()
                .map(|(i, &row)| AlignedPoint {
                    date: table.dates()[row],
                    location: table.locations()[row].clone(),
                    truth: truth_column[row],
                    prediction: predicted[i],
                })
                .collect();

            let truth: Vec<f64> = aligned.iter().map(|p| p.truth).collect();
            let prediction: Vec<f64> = aligned.iter().map(|p| p.prediction).collect();
            let summary = ErrorSummary::compute(&truth, &prediction)?;
            let metrics = HorizonMetrics {
                horizon: h,
                rmse: summary.rmse,
                mae: summary.mae,
                bias: summary.bias,
                n: summary.n,
                aligned,
            };
            info!("Test {}", metrics);
            horizons.push(metrics);
        }

        Ok(EvaluationReport { horizons })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn table() -> FeatureTable {
        FeatureTable::new(
            vec!["A".into(); 3],
            vec![day(1), day(2), day(3)],
            vec![SplitAssignment::Train, SplitAssignment::Test, SplitAssignment::Test],
            vec!["x".into()],
            vec!["target_h1".into()],
            vec![vec![0.0, 1.0, 2.0], vec![10.0, 20.0, 30.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_scores_test_rows() {
        let predictions = Predictions {
            horizons: vec![1],
            values: array![[22.0], [27.0]],
        };
        let report = Evaluator::evaluate(&table(), &[1, 2], &predictions).unwrap();
        let m = report.horizon(1).unwrap();
        assert_eq!(m.n, 2);
        assert_abs_diff_eq!(m.mae, 2.5);
        assert_abs_diff_eq!(m.bias, -0.5);
        assert_abs_diff_eq!(m.rmse, (6.5f64).sqrt());
        assert_eq!(m.aligned[0].date, day(2));
        assert_eq!(m.aligned[1].truth, 30.0);
        assert_eq!(m.aligned[1].prediction, 27.0);
    }

    #[test]
    fn test_rejects_train_rows() {
        let predictions = Predictions {
            horizons: vec![1],
            values: array![[10.0]],
        };
        assert!(Evaluator::evaluate(&table(), &[0], &predictions).is_err());
    }
}
