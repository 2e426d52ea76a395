//! # Meteo Forecast
//!
//! Multi-horizon forecasting on the feature tables built by
//! `meteo_features`.
//!
//! ## Features
//!
//! - A fit/predict [`Regressor`] contract with ridge, mean and persistence models
//! - Independent, joint and cascaded multi-horizon ensembles
//! - Forward-chaining cross-validation and candidate selection
//! - Per-horizon RMSE/MAE/bias on the test partition with aligned series
//! - An end-to-end [`ForecastPipeline`] and the `meteocast` binary
//!
//! ## Quick Start
//!
//! ```no_run
//! use meteo_features::CsvStore;
//! use meteo_forecast::{EnsembleStrategy, ForecastPipeline, ModelKind, PipelineConfig};
//!
//! let config = PipelineConfig::default()
//!     .with_strategy(EnsembleStrategy::Cascaded)
//!     .with_model(ModelKind::Ridge { alpha: 1.0 });
//! let pipeline = ForecastPipeline::new(config)?;
//! let store = CsvStore::open("observations.csv")?;
//! let (_dataset, report) = pipeline.run(&store)?;
//! println!("{}", report.evaluation);
//! # Ok::<(), meteo_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod cv;
pub mod ensemble;
pub mod error;
pub mod evaluate;
pub mod matrix;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::cv::{cross_validate, select_candidate, CvConfig, CvScore};
pub use crate::ensemble::{chain_feature_name, EnsembleStrategy, ForecastEnsemble, Predictions};
pub use crate::error::{ForecastError, Result};
pub use crate::evaluate::{AlignedPoint, EvaluationReport, Evaluator, HorizonMetrics};
pub use crate::matrix::{ModelInput, TargetMatrix};
pub use crate::models::{
    MeanRegressor, ModelKind, MultiOutputRegressor, PerTargetWrapper, PersistenceRegressor,
    Regressor, RegressorFactory, RidgeRegression,
};
pub use crate::pipeline::{ForecastPipeline, PipelineReport};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
