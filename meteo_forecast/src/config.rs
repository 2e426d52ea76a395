//! End-to-end run configuration
//!
//! The feature settings are flattened into the same JSON object as the
//! model settings, so one file describes a whole run.

use crate::cv::CvConfig;
use crate::ensemble::EnsembleStrategy;
use crate::error::Result;
use crate::models::ModelKind;
use meteo_features::{FeatureConfig, FeatureError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Feature, model and validation settings of one run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    #[serde(flatten)]
    pub features: FeatureConfig,
    /// How horizons share models
    pub strategy: EnsembleStrategy,
    /// Model used when `candidates` is empty
    pub model: ModelKind,
    /// Models compared by forward-chaining cross-validation
    pub candidates: Vec<ModelKind>,
    /// Cross-validation settings for `candidates`
    pub cv: CvConfig,
}

impl PipelineConfig {
    /// Defaults around a feature configuration
    pub fn new(features: FeatureConfig) -> Self {
        Self {
            features,
            ..Self::default()
        }
    }

    /// Set the ensemble strategy
    pub fn with_strategy(mut self, strategy: EnsembleStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    /// Set the cross-validated candidates
    pub fn with_candidates(mut self, candidates: Vec<ModelKind>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Set the cross-validation settings
    pub fn with_cv(mut self, cv: CvConfig) -> Self {
        self.cv = cv;
        self
    }

    /// Check every setting before any data is read
    pub fn validate(&self) -> Result<()> {
        self.features.validate()?;
        for kind in std::iter::once(&self.model).chain(self.candidates.iter()) {
            kind.validate()
                .map_err(|e| FeatureError::ConfigInvalid(format!("model {}: {}", kind, e)))?;
        }
        if !self.candidates.is_empty() && self.cv.n_splits == 0 {
            return Err(
                FeatureError::ConfigInvalid("cv.n_splits must be at least 1".to_string()).into(),
            );
        }
        // the default reference window is the training window, which contains every fold
        if !self.candidates.is_empty()
            && !self.features.climatology_fields.is_empty()
            && self.features.reference_window.is_none()
        {
            return Err(FeatureError::ConfigInvalid(
                "climatology with candidates needs a reference_window that ends before the first \
                 cross-validation block"
                    .to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Read and validate a JSON configuration
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meteo_features::Field;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let config = PipelineConfig::default()
            .with_strategy(EnsembleStrategy::Cascaded)
            .with_candidates(vec![ModelKind::Mean, ModelKind::Ridge { alpha: 2.0 }]);
        config.to_json_file(&path).unwrap();
        assert_eq!(PipelineConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_flat_json_layout() {
        let json = r#"{
            "target_locations": ["Memphis"],
            "lag_fields": ["t2m"],
            "lag_depths": [1, 2],
            "horizons": [1],
            "strategy": "joint",
            "model": {"kind": "persistence", "column": "t2m"}
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.features.target_locations, vec!["Memphis".to_string()]);
        assert_eq!(config.features.lag_fields, vec![Field::T2m]);
        assert_eq!(config.strategy, EnsembleStrategy::Joint);
        assert_eq!(
            config.model,
            ModelKind::Persistence {
                column: "t2m".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_model_is_config_error() {
        let config = PipelineConfig::default().with_model(ModelKind::Ridge { alpha: -1.0 });
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            crate::ForecastError::Feature(FeatureError::ConfigInvalid(_))
        ));
    }
}
