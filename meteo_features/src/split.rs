//! Leakage-safe splitting
//!
//! Rows are assigned to train or test purely by date. Cross-validation on
//! the training partition only ever chains forward in time.

use crate::config::DateWindow;
use crate::error::{FeatureError, Result};
use crate::frame::FeatureFrame;
use crate::schema::FeatureSchema;
use crate::shift::shift_date;
use crate::table::{FeatureTable, SplitAssignment};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Row counts produced by a split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitReport {
    /// Rows in the training partition
    pub train: usize,
    /// Rows in the test partition
    pub test: usize,
    /// Rows outside both windows
    pub unassigned: usize,
    /// Training rows removed because a target reached into the test window
    pub purged: usize,
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "train={} test={} unassigned={} purged={}",
            self.train, self.test, self.unassigned, self.purged
        )
    }
}

/// Assigns rows to train/test by closed date windows
#[derive(Debug, Clone)]
pub struct Splitter {
    train: DateWindow,
    test: DateWindow,
    purge_horizon: Option<u32>,
}

impl Splitter {
    /// New splitter
    pub fn new(train: DateWindow, test: DateWindow) -> Self {
        Self {
            train,
            test,
            purge_horizon: None,
        }
    }

    /// Drop training rows whose target `horizon` days ahead lands in the test window
    pub fn with_purge(mut self, horizon: u32) -> Self {
        self.purge_horizon = Some(horizon);
        self
    }

    /// Partition for a date, if it falls in either window
    pub fn assign(&self, date: NaiveDate) -> Option<SplitAssignment> {
        if self.train.contains(date) {
            Some(SplitAssignment::Train)
        } else if self.test.contains(date) {
            Some(SplitAssignment::Test)
        } else {
            None
        }
    }

    fn purged(&self, date: NaiveDate) -> bool {
        match self.purge_horizon {
            Some(h) => shift_date(date, h as i64).map_or(true, |d| d >= self.test.start),
            None => false,
        }
    }

    /// Turn a complete frame into a table of assigned rows, in schema column order
    pub fn apply(
        &self,
        frame: &FeatureFrame,
        schema: &FeatureSchema,
    ) -> Result<(FeatureTable, SplitReport)> {
        schema.validate_frame(frame)?;

        let mut report = SplitReport::default();
        let mut rows = Vec::new();
        let mut splits = Vec::new();
        for (i, obs) in frame.observations().iter().enumerate() {
            match self.assign(obs.date) {
                Some(SplitAssignment::Train) if self.purged(obs.date) => report.purged += 1,
                Some(split) => {
                    match split {
                        SplitAssignment::Train => report.train += 1,
                        SplitAssignment::Test => report.test += 1,
                    }
                    rows.push(i);
                    splits.push(split);
                }
                None => report.unassigned += 1,
            }
        }

        let names = schema.column_names();
        let mut columns = Vec::with_capacity(names.len());
        for name in &names {
            let column = frame.column(name).ok_or_else(|| {
                FeatureError::SchemaMismatch(format!("Column '{}' was not computed", name))
            })?;
            let values = rows
                .iter()
                .map(|&i| {
                    column.values[i].ok_or_else(|| {
                        FeatureError::DataError(format!(
                            "Column '{}' has a missing value at row {}; drop incomplete rows before splitting",
                            name, i
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            columns.push(values);
        }

        let observations = frame.observations();
        let table = FeatureTable::new(
            rows.iter().map(|&i| observations[i].location.clone()).collect(),
            rows.iter().map(|&i| observations[i].date).collect(),
            splits,
            schema.feature_names(),
            schema.target_names(),
            columns,
        )?;

        if report.train == 0 {
            warn!("Training partition {} is empty", self.train);
        }
        if report.test == 0 {
            warn!("Test partition {} is empty", self.test);
        }
        info!("Split rows: {}", report);
        Ok((table, report))
    }
}

/// Row indices of one forward-chaining fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvFold {
    /// Fold number, oldest first
    pub fold: usize,
    /// Training rows, all dated before every validation row
    pub train: Vec<usize>,
    /// Validation rows
    pub validation: Vec<usize>,
}

/// Expanding-window cross-validation over unique dates
///
/// The dates are cut into `n_splits + 1` equal blocks. Fold `k` validates
/// on block `k + 1` and trains on every earlier date, minus a `gap` of
/// dates right before the validation block. All rows sharing a date stay
/// on the same side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandingWindowCv {
    /// Number of folds
    pub n_splits: usize,
    /// Minimum number of training dates per fold
    pub min_train_dates: usize,
    /// Dates left out between training and validation
    pub gap: usize,
}

impl Default for ExpandingWindowCv {
    fn default() -> Self {
        Self {
            n_splits: 3,
            min_train_dates: 30,
            gap: 0,
        }
    }
}

impl ExpandingWindowCv {
    /// New cross-validator
    pub fn new(n_splits: usize, min_train_dates: usize, gap: usize) -> Result<Self> {
        if n_splits == 0 {
            return Err(FeatureError::ConfigInvalid(
                "n_splits must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            n_splits,
            min_train_dates: min_train_dates.max(1),
            gap,
        })
    }

    /// Folds over rows with the given dates
    pub fn folds(&self, dates: &[NaiveDate]) -> Result<Vec<CvFold>> {
        let mut unique: Vec<NaiveDate> = dates.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let m = unique.len();
        let block = m / (self.n_splits + 1);
        if block == 0 {
            return Err(FeatureError::DataError(format!(
                "{} dates are too few for {} folds",
                m, self.n_splits
            )));
        }

        let mut folds = Vec::with_capacity(self.n_splits);
        for k in 0..self.n_splits {
            let val_start = m - (self.n_splits - k) * block;
            let val_end = val_start + block;
            let train_end = val_start.saturating_sub(self.gap);
            if train_end < self.min_train_dates {
                continue;
            }

            let last_train = unique[train_end - 1];
            let first_val = unique[val_start];
            let last_val = unique[val_end - 1];
            let train = (0..dates.len()).filter(|&i| dates[i] <= last_train).collect();
            let validation = (0..dates.len())
                .filter(|&i| first_val <= dates[i] && dates[i] <= last_val)
                .collect();
            folds.push(CvFold {
                fold: folds.len(),
                train,
                validation,
            });
        }

        if folds.is_empty() {
            return Err(FeatureError::DataError(format!(
                "No fold has at least {} training dates",
                self.min_train_dates
            )));
        }
        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn test_assign_by_closed_windows() {
        let splitter = Splitter::new(
            DateWindow::new(day(1), day(10)).unwrap(),
            DateWindow::new(day(11), day(20)).unwrap(),
        );
        assert_eq!(splitter.assign(day(10)), Some(SplitAssignment::Train));
        assert_eq!(splitter.assign(day(11)), Some(SplitAssignment::Test));
        assert_eq!(splitter.assign(day(21)), None);
    }

    #[test]
    fn test_purge_near_boundary() {
        let splitter = Splitter::new(
            DateWindow::new(day(1), day(10)).unwrap(),
            DateWindow::new(day(11), day(20)).unwrap(),
        )
        .with_purge(2);
        assert!(!splitter.purged(day(8)));
        assert!(splitter.purged(day(9)));
    }

    #[test]
    fn test_folds_chain_forward() {
        // two locations per date
        let dates: Vec<NaiveDate> = (1..=12).flat_map(|d| [day(d), day(d)]).collect();
        let cv = ExpandingWindowCv::new(3, 2, 1).unwrap();
        let folds = cv.folds(&dates).unwrap();
        assert_eq!(folds.len(), 3);

        for fold in &folds {
            let last_train = fold.train.iter().map(|&i| dates[i]).max().unwrap();
            let first_val = fold.validation.iter().map(|&i| dates[i]).min().unwrap();
            assert!(last_train < first_val);
            // the gap leaves one date out
            assert_eq!((first_val - last_train).num_days(), 2);
        }
        // expanding: each fold trains on more rows than the previous one
        assert!(folds[0].train.len() < folds[1].train.len());
        assert!(folds[1].train.len() < folds[2].train.len());
        assert_eq!(folds[2].validation.len(), 6);
    }

    #[test]
    fn test_too_few_dates() {
        let cv = ExpandingWindowCv::new(5, 1, 0).unwrap();
        assert!(cv.folds(&[day(1), day(2)]).is_err());
    }
}
