//! Trainable feature table
//!
//! Every cell is present and every row belongs to exactly one partition.
//! This is the shape that is persisted and handed to the models.

use crate::error::{FeatureError, Result};
use crate::schema::parse_target_column;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Partition of a row, fixed once assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitAssignment {
    /// Training partition
    Train,
    /// Held-out test partition
    Test,
}

impl SplitAssignment {
    /// Label used in persisted tables
    pub fn as_str(self) -> &'static str {
        match self {
            SplitAssignment::Train => "train",
            SplitAssignment::Test => "test",
        }
    }
}

impl fmt::Display for SplitAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitAssignment {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(SplitAssignment::Train),
            "test" => Ok(SplitAssignment::Test),
            other => Err(FeatureError::DataError(format!(
                "Unknown split label '{}'",
                other
            ))),
        }
    }
}

/// Complete rows with their split, features and targets
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    locations: Vec<String>,
    dates: Vec<NaiveDate>,
    splits: Vec<SplitAssignment>,
    feature_names: Vec<String>,
    target_names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Assemble a table; `columns` holds the features followed by the targets
    pub fn new(
        locations: Vec<String>,
        dates: Vec<NaiveDate>,
        splits: Vec<SplitAssignment>,
        feature_names: Vec<String>,
        target_names: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let n = dates.len();
        if locations.len() != n || splits.len() != n {
            return Err(FeatureError::DataError(format!(
                "Key columns disagree: {} locations, {} dates, {} splits",
                locations.len(),
                n,
                splits.len()
            )));
        }
        if columns.len() != feature_names.len() + target_names.len() {
            return Err(FeatureError::SchemaMismatch(format!(
                "{} columns for {} names",
                columns.len(),
                feature_names.len() + target_names.len()
            )));
        }
        if let Some(bad) = target_names.iter().find(|t| parse_target_column(t).is_none()) {
            return Err(FeatureError::SchemaMismatch(format!(
                "'{}' is not a target column name",
                bad
            )));
        }
        for (name, column) in feature_names.iter().chain(target_names.iter()).zip(&columns) {
            if column.len() != n {
                return Err(FeatureError::DataError(format!(
                    "Column '{}' has {} values for {} rows",
                    name,
                    column.len(),
                    n
                )));
            }
            if column.iter().any(|v| !v.is_finite()) {
                return Err(FeatureError::DataError(format!(
                    "Column '{}' contains a missing value",
                    name
                )));
            }
        }

        Ok(Self {
            locations,
            dates,
            splits,
            feature_names,
            target_names,
            columns,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Location of each row
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Date of each row
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Split of each row
    pub fn splits(&self) -> &[SplitAssignment] {
        &self.splits
    }

    /// Feature column names
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Target column names
    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    /// Horizons of the target columns, in column order
    pub fn horizons(&self) -> Vec<u32> {
        self.target_names
            .iter()
            .filter_map(|name| parse_target_column(name))
            .collect()
    }

    /// Values of a feature or target column
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.feature_names
            .iter()
            .chain(self.target_names.iter())
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Feature then target columns
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Row indices of one partition, in table order
    pub fn rows(&self, split: SplitAssignment) -> Vec<usize> {
        self.splits
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == split)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    fn table() -> FeatureTable {
        FeatureTable::new(
            vec!["A".into(), "A".into()],
            vec![day(1), day(2)],
            vec![SplitAssignment::Train, SplitAssignment::Test],
            vec!["t2m".into()],
            vec!["target_h1".into()],
            vec![vec![1.0, 2.0], vec![2.0, 3.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let table = table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.horizons(), vec![1]);
        assert_eq!(table.column("target_h1"), Some(&[2.0, 3.0][..]));
        assert_eq!(table.rows(SplitAssignment::Test), vec![1]);
    }

    #[test]
    fn test_rejects_missing_values() {
        let result = FeatureTable::new(
            vec!["A".into()],
            vec![day(1)],
            vec![SplitAssignment::Train],
            vec!["t2m".into()],
            vec![],
            vec![vec![f64::NAN]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_split_labels() {
        assert_eq!("train".parse::<SplitAssignment>().unwrap(), SplitAssignment::Train);
        assert!("validation".parse::<SplitAssignment>().is_err());
    }
}
