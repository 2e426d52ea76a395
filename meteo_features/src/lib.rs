//! # Meteo Features
//!
//! Builds leakage-safe feature tables from daily per-location weather
//! observations.
//!
//! ## Features
//!
//! - Sentinel cleaning with whole-row exclusion
//! - Same-day derived quantities (ratios, spreads, wind components, seasonal encodings)
//! - Per-location lags, trailing means and reference-period climatology
//! - Lagged features joined from auxiliary locations
//! - Forward-shifted horizon targets
//! - Date-window train/test split and forward-chaining cross-validation folds
//! - CSV and Parquet observation stores and feature artifacts (polars)
//!
//! ## Example
//!
//! ```no_run
//! use meteo_features::{CsvStore, FeatureBuilder, FeatureConfig};
//!
//! let config = FeatureConfig::default();
//! let store = CsvStore::open("observations.csv")?;
//! let dataset = FeatureBuilder::new(config)?.build(&store)?;
//! println!("{} / {}", dataset.drop_report, dataset.split_report);
//! # Ok::<(), meteo_features::FeatureError>(())
//! ```

pub mod artifact;
pub mod builder;
pub mod clean;
pub mod config;
pub mod cross_location;
pub mod derived;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod observation;
pub mod schema;
pub mod shift;
pub mod split;
pub mod store;
pub mod table;
pub mod targets;
pub mod temporal;

pub use artifact::FeatureArtifact;
pub use builder::{FeatureBuilder, FeatureDataset};
pub use clean::{CleanOutcome, SentinelCleaner};
pub use config::{DateWindow, DayOfYearMode, DerivedFeature, FeatureConfig, ShiftMode};
pub use cross_location::CrossLocationGenerator;
pub use derived::DerivedFeatureCalculator;
pub use encoding::encode_locations;
pub use error::{FeatureError, Result};
pub use frame::{DropReason, DropReport, FeatureColumn, FeatureFrame};
pub use observation::{Field, Observation};
pub use schema::{
    check_columns, target_column_name, DerivedComponent, FeatureSchema, FeatureSpec,
    SchemaBuilder, TargetSpec,
};
pub use split::{CvFold, ExpandingWindowCv, SplitReport, Splitter};
pub use store::{open_store, CsvStore, InMemoryStore, ObservationStore, ParquetStore};
pub use table::{FeatureTable, SplitAssignment};
pub use targets::HorizonTargetBuilder;
pub use temporal::{ClimatologyTable, TemporalFeatureGenerator};
