//! Persisted feature tables
//!
//! Layout: `location`, `date`, `split`, then every feature column followed
//! by every `target_h{h}` column, all `Float64`.

use crate::error::Result;
use crate::schema::parse_target_column;
use crate::store::{date_series, read_dates, read_floats, read_strings};
use crate::table::{FeatureTable, SplitAssignment};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

const KEY_COLUMNS: [&str; 3] = ["location", "date", "split"];

/// Reads and writes [`FeatureTable`]s as Parquet or CSV
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureArtifact;

impl FeatureArtifact {
    /// Convert a table into a polars frame
    pub fn to_dataframe(table: &FeatureTable) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(KEY_COLUMNS.len() + table.columns().len());
        columns.push(Series::new("location", table.locations()));
        columns.push(date_series("date", table.dates())?);
        columns.push(Series::new(
            "split",
            table.splits().iter().map(|s| s.as_str()).collect::<Vec<&str>>(),
        ));
        for (name, values) in table
            .feature_names()
            .iter()
            .chain(table.target_names().iter())
            .zip(table.columns())
        {
            columns.push(Series::new(name, values.as_slice()));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Rebuild a table from a polars frame
    pub fn from_dataframe(df: &DataFrame) -> Result<FeatureTable> {
        let locations = read_strings(df, "location")?;
        let dates = read_dates(df, "date")?;
        let splits = read_strings(df, "split")?
            .iter()
            .map(|s| s.parse::<SplitAssignment>())
            .collect::<Result<Vec<_>>>()?;

        let mut feature_names = Vec::new();
        let mut target_names = Vec::new();
        for name in df.get_column_names() {
            if KEY_COLUMNS.contains(&name) {
                continue;
            }
            if parse_target_column(name).is_some() {
                target_names.push(name.to_string());
            } else {
                feature_names.push(name.to_string());
            }
        }

        let columns = feature_names
            .iter()
            .chain(target_names.iter())
            .map(|name| read_floats(df, name))
            .collect::<Result<Vec<_>>>()?;

        FeatureTable::new(locations, dates, splits, feature_names, target_names, columns)
    }

    /// Write a table as Parquet
    pub fn write_parquet<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
        let mut df = Self::to_dataframe(table)?;
        let mut file = File::create(path.as_ref())?;
        ParquetWriter::new(&mut file).finish(&mut df)?;
        info!("Wrote {} rows to {}", table.len(), path.as_ref().display());
        Ok(())
    }

    /// Read a table written by [`FeatureArtifact::write_parquet`]
    pub fn read_parquet<P: AsRef<Path>>(path: P) -> Result<FeatureTable> {
        let file = File::open(path)?;
        let df = ParquetReader::new(file).finish()?;
        Self::from_dataframe(&df)
    }

    /// Write a table as CSV
    pub fn write_csv<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
        let mut df = Self::to_dataframe(table)?;
        let mut file = File::create(path.as_ref())?;
        CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
        info!("Wrote {} rows to {}", table.len(), path.as_ref().display());
        Ok(())
    }

    /// Read a table written by [`FeatureArtifact::write_csv`]
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<FeatureTable> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;
        Self::from_dataframe(&df)
    }

    /// Write by extension: `.csv` or Parquet otherwise
    pub fn write<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("csv") => Self::write_csv(table, path),
            _ => Self::write_parquet(table, path),
        }
    }
}
