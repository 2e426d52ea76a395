//! Forward-chaining cross-validation and model selection
//!
//! Folds come from [`ExpandingWindowCv`], so every validation date follows
//! every training date of its fold. Shuffled k-fold is deliberately absent.

use crate::ensemble::{EnsembleStrategy, ForecastEnsemble};
use crate::error::{ForecastError, Result};
use crate::matrix::{ModelInput, TargetMatrix};
use crate::models::ModelKind;
use chrono::NaiveDate;
use meteo_features::ExpandingWindowCv;
use meteo_math::ErrorSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Cross-validation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvConfig {
    /// Number of folds
    pub n_splits: usize,
    /// Minimum number of training dates per fold
    pub min_train_dates: usize,
    /// Dates skipped before each validation block; the largest horizon when unset
    pub gap: Option<usize>,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            n_splits: 3,
            min_train_dates: 30,
            gap: None,
        }
    }
}

impl CvConfig {
    /// Fold generator, using `max_horizon` as the gap unless one is configured
    pub fn splitter(&self, max_horizon: u32) -> Result<ExpandingWindowCv> {
        let gap = self.gap.unwrap_or(max_horizon as usize);
        Ok(ExpandingWindowCv::new(
            self.n_splits,
            self.min_train_dates,
            gap,
        )?)
    }
}

/// Validation error of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvScore {
    /// Candidate description
    pub model: String,
    /// RMSE over every horizon of each validation fold, oldest fold first
    pub fold_rmse: Vec<f64>,
    /// Mean of `fold_rmse`
    pub mean_rmse: f64,
}

impl fmt::Display for CvScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: mean RMSE {:.4} over {} folds",
            self.model,
            self.mean_rmse,
            self.fold_rmse.len()
        )
    }
}

/// Score `kind` under `strategy` on forward-chaining folds of rows dated `dates`
pub fn cross_validate(
    strategy: EnsembleStrategy,
    kind: &ModelKind,
    input: &ModelInput,
    targets: &TargetMatrix,
    dates: &[NaiveDate],
    cv: &ExpandingWindowCv,
) -> Result<CvScore> {
    if dates.len() != input.nrows() || input.nrows() != targets.nrows() {
        return Err(ForecastError::DataError(format!(
            "{} dates, {} feature rows and {} target rows",
            dates.len(),
            input.nrows(),
            targets.nrows()
        )));
    }

    let mut fold_rmse = Vec::new();
    for fold in cv.folds(dates)? {
        let mut ensemble = ForecastEnsemble::from_kind(strategy, kind)?;
        ensemble.fit(&input.select(&fold.train), &targets.select(&fold.train))?;
        let predicted = ensemble.predict(&input.select(&fold.validation))?;
        let truth = targets.select(&fold.validation);

        let actual: Vec<f64> = truth.y().iter().copied().collect();
        let predicted: Vec<f64> = predicted.values.iter().copied().collect();
        let summary = ErrorSummary::compute(&actual, &predicted)?;
        debug!(
            "Fold {} of {}: {} train rows, {} validation rows, RMSE {:.4}",
            fold.fold,
            kind,
            fold.train.len(),
            fold.validation.len(),
            summary.rmse
        );
        fold_rmse.push(summary.rmse);
    }

    let mean_rmse = fold_rmse.iter().sum::<f64>() / fold_rmse.len() as f64;
    Ok(CvScore {
        model: kind.to_string(),
        fold_rmse,
        mean_rmse,
    })
}

/// Candidate with the lowest mean validation RMSE, with every score
///
/// Ties keep the earlier candidate.
pub fn select_candidate(
    strategy: EnsembleStrategy,
    candidates: &[ModelKind],
    input: &ModelInput,
    targets: &TargetMatrix,
    dates: &[NaiveDate],
    cv: &ExpandingWindowCv,
) -> Result<(ModelKind, Vec<CvScore>)> {
    let mut best: Option<usize> = None;
    let mut scores: Vec<CvScore> = Vec::with_capacity(candidates.len());
    for (i, kind) in candidates.iter().enumerate() {
        let score = cross_validate(strategy, kind, input, targets, dates, cv)?;
        info!("Cross-validated {}", score);
        let better = match best {
            Some(b) => score.mean_rmse < scores[b].mean_rmse,
            None => score.mean_rmse.is_finite(),
        };
        if better {
            best = Some(i);
        }
        scores.push(score);
    }

    let best = best.ok_or_else(|| {
        ForecastError::InvalidParameter("No candidate produced a finite CV score".to_string())
    })?;
    Ok((candidates[best].clone(), scores))
}
