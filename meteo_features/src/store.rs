//! Observation store adapters
//!
//! Stores hand back observations for a location set and an inclusive date
//! range, sorted by `(date, location)`.

use crate::config::DateWindow;
use crate::error::{FeatureError, Result};
use crate::observation::{sort_and_check, Field, Observation};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// Days from 0001-01-01 to the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Source of daily per-location observations
pub trait ObservationStore {
    /// Rows for `locations` dated inside `window`, sorted by `(date, location)`
    fn query(&self, locations: &[String], window: &DateWindow) -> Result<Vec<Observation>>;
}

/// Store over observations already in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    observations: Vec<Observation>,
}

impl InMemoryStore {
    /// Create a store; duplicate `(location, date)` keys are rejected
    pub fn new(mut observations: Vec<Observation>) -> Result<Self> {
        sort_and_check(&mut observations)?;
        Ok(Self { observations })
    }

    /// Number of stored observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl ObservationStore for InMemoryStore {
    fn query(&self, locations: &[String], window: &DateWindow) -> Result<Vec<Observation>> {
        Ok(self
            .observations
            .iter()
            .filter(|o| window.contains(o.date) && locations.contains(&o.location))
            .cloned()
            .collect())
    }
}

/// Store backed by a CSV table with `date`, `location` and field columns
#[derive(Debug, Clone)]
pub struct CsvStore {
    inner: InMemoryStore,
}

impl CsvStore {
    /// Load a CSV file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;
        let observations = observations_from_frame(&df)?;
        info!(
            "Loaded {} observations from {}",
            observations.len(),
            path.as_ref().display()
        );
        Ok(Self {
            inner: InMemoryStore::new(observations)?,
        })
    }
}

impl ObservationStore for CsvStore {
    fn query(&self, locations: &[String], window: &DateWindow) -> Result<Vec<Observation>> {
        self.inner.query(locations, window)
    }
}

/// Store backed by a Parquet table with `date`, `location` and field columns
#[derive(Debug, Clone)]
pub struct ParquetStore {
    inner: InMemoryStore,
}

impl ParquetStore {
    /// Load a Parquet file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let df = ParquetReader::new(file).finish()?;
        let observations = observations_from_frame(&df)?;
        info!(
            "Loaded {} observations from {}",
            observations.len(),
            path.as_ref().display()
        );
        Ok(Self {
            inner: InMemoryStore::new(observations)?,
        })
    }
}

impl ObservationStore for ParquetStore {
    fn query(&self, locations: &[String], window: &DateWindow) -> Result<Vec<Observation>> {
        self.inner.query(locations, window)
    }
}

/// Open a CSV or Parquet store by file extension
pub fn open_store<P: AsRef<Path>>(path: P) -> Result<Box<dyn ObservationStore>> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => Ok(Box::new(CsvStore::open(path)?)),
        Some("parquet") | Some("pq") => Ok(Box::new(ParquetStore::open(path)?)),
        _ => Err(FeatureError::ConfigInvalid(format!(
            "Unsupported observation file '{}'; expected .csv or .parquet",
            path.display()
        ))),
    }
}

/// Convert a table into observations; absent field columns read as NaN
pub fn observations_from_frame(df: &DataFrame) -> Result<Vec<Observation>> {
    let dates = read_dates(df, "date")?;
    let locations = read_strings(df, "location")?;

    let mut observations: Vec<Observation> = dates
        .into_iter()
        .zip(locations)
        .map(|(date, location)| Observation::filled(location, date, f64::NAN))
        .collect();

    let names = df.get_column_names();
    for field in Field::ALL {
        if !names.contains(&field.name()) {
            warn!("Column '{}' is absent; its values are treated as missing", field);
            continue;
        }
        let values = read_floats(df, field.name())?;
        for (obs, value) in observations.iter_mut().zip(values) {
            obs.set(field, value);
        }
    }
    Ok(observations)
}

/// Parse a date column stored either as `YYYY-MM-DD` text or as a native date
pub(crate) fn read_dates(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::Utf8 => column
            .utf8()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                let text = value.ok_or_else(|| {
                    FeatureError::DataError(format!("Null '{}' at row {}", name, row))
                })?;
                NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|e| {
                    FeatureError::DataError(format!(
                        "Invalid date '{}' at row {}: {}",
                        text, row, e
                    ))
                })
            })
            .collect(),
        DataType::Date => column
            .cast(&DataType::Int32)?
            .i32()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value
                    .and_then(|days| {
                        NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
                    })
                    .ok_or_else(|| {
                        FeatureError::DataError(format!("Invalid '{}' at row {}", name, row))
                    })
            })
            .collect(),
        other => Err(FeatureError::DataError(format!(
            "Column '{}' has type {:?}; expected text or date",
            name, other
        ))),
    }
}

pub(crate) fn read_strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df.column(name)?.cast(&DataType::Utf8)?;
    let values = column.utf8()?;
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .map(str::to_string)
                .ok_or_else(|| FeatureError::DataError(format!("Null '{}' at row {}", name, row)))
        })
        .collect()
}

/// Nulls read as NaN
pub(crate) fn read_floats(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let values = column.f64()?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Native date column from calendar dates
pub(crate) fn date_series(name: &str, dates: &[NaiveDate]) -> Result<Series> {
    let days: Vec<i32> = dates
        .iter()
        .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
        .collect();
    Ok(Series::new(name, days).cast(&DataType::Date)?)
}
