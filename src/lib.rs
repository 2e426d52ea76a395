//! # meteocast
//!
//! Leakage-safe weather feature construction and multi-horizon forecasting.
//!
//! The workspace is split into three crates, re-exported here:
//!
//! - [`math`] (`meteo_math`): rolling means, derived quantities and error metrics
//! - [`features`] (`meteo_features`): observation stores, feature stages, splitting and artifacts
//! - [`forecast`] (`meteo_forecast`): regressors, ensembles, cross-validation and evaluation
//!
//! ## Example
//!
//! ```
//! use meteocast_workspace::forecast::{ForecastPipeline, PipelineConfig};
//!
//! let pipeline = ForecastPipeline::new(PipelineConfig::default()).unwrap();
//! assert_eq!(pipeline.config().features.horizons, vec![1, 2, 3]);
//! ```

pub use meteo_features as features;
pub use meteo_forecast as forecast;
pub use meteo_math as math;
