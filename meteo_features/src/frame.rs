//! Column-oriented feature frame keyed by `(location, date)`
//!
//! Rows are held sorted by location and then by date, so every location's
//! series is a contiguous block. Stages append columns; a missing cell
//! records why the row will later be dropped.

use crate::error::{FeatureError, Result};
use crate::observation::{Field, Observation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

/// Why a row is excluded from the trainable set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Sentinel, NaN or non-finite derived value
    MissingData,
    /// Lag, rolling or horizon shift past the end of the series
    ShiftBoundary,
    /// Cross-location or climatology join had no match
    JoinMiss,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DropReason::MissingData => "missing data",
            DropReason::ShiftBoundary => "shift boundary",
            DropReason::JoinMiss => "join miss",
        };
        f.write_str(name)
    }
}

/// Count of excluded rows per reason
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropReport {
    counts: BTreeMap<DropReason, usize>,
}

impl DropReport {
    /// Record `n` rows dropped for `reason`
    pub fn add(&mut self, reason: DropReason, n: usize) {
        if n > 0 {
            *self.counts.entry(reason).or_insert(0) += n;
        }
    }

    /// Rows dropped for one reason
    pub fn count(&self, reason: DropReason) -> usize {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    /// Rows dropped for any reason
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl fmt::Display for DropReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows dropped", self.total())?;
        if !self.counts.is_empty() {
            let parts: Vec<String> = self
                .counts
                .iter()
                .map(|(reason, n)| format!("{}: {}", reason, n))
                .collect();
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}

/// A named column of optional values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    /// Column name
    pub name: String,
    /// One cell per row
    pub values: Vec<Option<f64>>,
}

/// Contiguous block of rows belonging to one location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationBlock {
    /// Location name
    pub location: String,
    /// Row range inside the frame
    pub rows: Range<usize>,
}

/// Observations plus the feature columns computed from them
#[derive(Debug, Clone, Default)]
pub struct FeatureFrame {
    observations: Vec<Observation>,
    columns: Vec<FeatureColumn>,
    drop_reasons: Vec<Option<DropReason>>,
}

impl FeatureFrame {
    /// Build a frame from observations; rows are re-sorted by `(location, date)`
    pub fn new(mut observations: Vec<Observation>) -> Result<Self> {
        observations.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.date.cmp(&b.date))
        });
        if let Some(pair) = observations
            .windows(2)
            .find(|w| w[0].location == w[1].location && w[0].date == w[1].date)
        {
            return Err(FeatureError::DataError(format!(
                "Duplicate observation for ({}, {})",
                pair[0].location, pair[0].date
            )));
        }

        let n = observations.len();
        Ok(Self {
            observations,
            columns: Vec::new(),
            drop_reasons: vec![None; n],
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the frame has no rows
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Underlying observations, one per row
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Dates, one per row
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    /// Raw field values, one per row
    pub fn field_values(&self, field: Field) -> Vec<f64> {
        self.observations.iter().map(|o| o.get(field)).collect()
    }

    /// Computed columns in insertion order
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// Names of the computed columns in insertion order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a computed column
    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// First recorded drop reason for a row
    pub fn drop_reason(&self, row: usize) -> Option<DropReason> {
        self.drop_reasons.get(row).copied().flatten()
    }

    /// Rows grouped by location, in location order
    pub fn location_blocks(&self) -> Vec<LocationBlock> {
        let mut blocks: Vec<LocationBlock> = Vec::new();
        for (i, obs) in self.observations.iter().enumerate() {
            match blocks.last_mut() {
                Some(block) if block.location == obs.location => block.rows.end = i + 1,
                _ => blocks.push(LocationBlock {
                    location: obs.location.clone(),
                    rows: i..i + 1,
                }),
            }
        }
        blocks
    }

    /// Flag a row as unusable; the first reason wins
    pub fn mark(&mut self, row: usize, reason: DropReason) {
        if let Some(slot) = self.drop_reasons.get_mut(row) {
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
    }

    /// Flag every blanked row with `reason` and return how many there are
    pub fn mark_blank_rows(&mut self, reason: DropReason) -> usize {
        let blank: Vec<usize> = (0..self.len())
            .filter(|&row| self.observations[row].is_blank())
            .collect();
        for &row in &blank {
            self.mark(row, reason);
        }
        blank.len()
    }

    /// Append a column; missing cells flag their row with `reason`
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
        reason: DropReason,
    ) -> Result<()> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(FeatureError::DataError(format!(
                "Column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.len()
            )));
        }
        if self.column(&name).is_some() {
            return Err(FeatureError::SchemaMismatch(format!(
                "Column '{}' computed twice",
                name
            )));
        }

        for (row, value) in values.iter().enumerate() {
            if value.map_or(true, |v| !v.is_finite()) {
                self.mark(row, reason);
            }
        }
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        self.columns.push(FeatureColumn { name, values });
        Ok(())
    }

    fn retain_rows(&mut self, keep: &[bool]) {
        let mut i = 0;
        self.observations.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        let mut i = 0;
        self.drop_reasons.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        for column in &mut self.columns {
            let mut i = 0;
            column.values.retain(|_| {
                let k = keep[i];
                i += 1;
                k
            });
        }
    }

    /// Remove every row with a missing cell and report what was removed
    pub fn drop_incomplete(&mut self) -> DropReport {
        let mut report = DropReport::default();
        let keep: Vec<bool> = (0..self.len())
            .map(|row| {
                let complete = self
                    .columns
                    .iter()
                    .all(|c| c.values[row].is_some());
                match (complete, self.drop_reasons[row]) {
                    (true, None) => true,
                    (_, Some(reason)) => {
                        report.add(reason, 1);
                        false
                    }
                    (false, None) => {
                        report.add(DropReason::MissingData, 1);
                        false
                    }
                }
            })
            .collect();
        self.retain_rows(&keep);
        report
    }
}
